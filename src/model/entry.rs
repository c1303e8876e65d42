use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Name of a service token a plugin requires or provides.
///
/// The server may send a bare string or a token object carrying a `name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "TokenRepr")]
pub struct Token(pub String);

impl Token {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TokenRepr {
    Name(String),
    Object { name: String },
}

impl From<TokenRepr> for Token {
    fn from(repr: TokenRepr) -> Self {
        match repr {
            TokenRepr::Name(name) | TokenRepr::Object { name } => Token(name),
        }
    }
}

/// One row of the plugin list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginEntry {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub extension: String,
    #[serde(default)]
    pub auto_start: bool,
    #[serde(default)]
    pub enabled: bool,
    /// Set by the server when an administrator forbids toggling this plugin.
    /// Only an indicator; the server performs the actual check.
    #[serde(default)]
    pub locked: bool,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub requires: Vec<Token>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub optional: Vec<Token>,
    #[serde(default)]
    pub provides: Option<Token>,
}

impl PluginEntry {
    pub fn provides_name(&self) -> &str {
        self.provides.as_ref().map(Token::name).unwrap_or_default()
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Token>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Token>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Actions the plugins endpoint accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Enable,
    Disable,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Enable => "enable",
            Action::Disable => "disable",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyStatus {
    Ok,
    Warning,
    Error,
}

/// Server reply to an enable/disable request. A missing `status` is kept as
/// `None` rather than treated as a failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionReply {
    #[serde(default)]
    pub status: Option<ReplyStatus>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Request body of an action POST.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionRequest<'a> {
    pub cmd: Action,
    pub plugin_name: &'a str,
}

/// Server-side plugin manager metadata, read once when the model is built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerMetadata {
    #[serde(default)]
    pub can_modify: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn entry_accepts_token_objects_and_strings() {
        let raw = r#"{
            "id": "@jupyterlab/foo:plugin",
            "description": "Foo",
            "extension": "@jupyterlab/foo",
            "autoStart": true,
            "enabled": true,
            "requires": [{"name": "@jupyterlab/translation:ITranslator"}, "ISettingRegistry"],
            "optional": null,
            "provides": {"name": "IFoo"}
        }"#;

        let entry: PluginEntry = serde_json::from_str(raw).expect("valid entry");

        assert_eq!(
            entry.requires,
            vec![
                Token::new("@jupyterlab/translation:ITranslator"),
                Token::new("ISettingRegistry"),
            ]
        );
        assert!(entry.optional.is_empty());
        assert_eq!(entry.provides_name(), "IFoo");
        assert!(entry.auto_start);
        assert!(!entry.locked);
    }

    #[test]
    fn action_request_uses_server_field_names() {
        let body = serde_json::to_value(ActionRequest {
            cmd: Action::Disable,
            plugin_name: "pkg:a",
        })
        .expect("serializable");

        assert_eq!(
            body,
            serde_json::json!({"cmd": "disable", "plugin_name": "pkg:a"})
        );
    }

    #[test]
    fn reply_without_status_is_absent() {
        let reply: ActionReply = serde_json::from_str("{}").expect("valid reply");
        assert_eq!(reply.status, None);

        let reply: ActionReply =
            serde_json::from_str(r#"{"status": "error", "message": "locked"}"#)
                .expect("valid reply");
        assert_eq!(reply.status, Some(ReplyStatus::Error));
        assert_eq!(reply.message.as_deref(), Some("locked"));
    }
}
