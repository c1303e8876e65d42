//! Command surface exposed by the plugin manager.

pub const OPEN: &str = "pluginmanager:open";
pub const REFRESH: &str = "pluginmanager:refresh";

pub const CATEGORY: &str = "Plugin Manager";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandInfo {
    pub id: &'static str,
    pub label: &'static str,
    pub caption: &'static str,
    /// Short name accepted by the palette.
    pub alias: &'static str,
}

#[derive(Debug, Clone)]
pub struct CommandRegistry {
    commands: Vec<CommandInfo>,
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self {
            commands: vec![
                CommandInfo {
                    id: OPEN,
                    label: "Advanced Plugin Manager",
                    caption: "Enable or disable individual plugins",
                    alias: "open",
                },
                CommandInfo {
                    id: REFRESH,
                    label: "Refresh Plugin List",
                    caption: "Refresh plugins list",
                    alias: "refresh",
                },
            ],
        }
    }
}

impl CommandRegistry {
    /// Resolves palette input by id, alias or label (case-insensitive).
    pub fn find(&self, input: &str) -> Option<&CommandInfo> {
        let input = input.trim();
        self.commands.iter().find(|command| {
            command.id == input
                || command.alias.eq_ignore_ascii_case(input)
                || command.label.eq_ignore_ascii_case(input)
        })
    }

    /// Commands whose id, alias or label contains `input`.
    pub fn matching(&self, input: &str) -> Vec<&CommandInfo> {
        let needle = input.trim().to_lowercase();
        self.commands
            .iter()
            .filter(|command| {
                needle.is_empty()
                    || command.id.contains(&needle)
                    || command.alias.contains(&needle)
                    || command.label.to_lowercase().contains(&needle)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_accepts_id_alias_and_label() {
        let registry = CommandRegistry::default();

        assert_eq!(registry.find(OPEN).map(|c| c.id), Some(OPEN));
        assert_eq!(registry.find("refresh").map(|c| c.id), Some(REFRESH));
        assert_eq!(
            registry.find("advanced plugin manager").map(|c| c.id),
            Some(OPEN)
        );
        assert!(registry.find("plugins.reload").is_none());
    }

    #[test]
    fn matching_filters_by_substring() {
        let registry = CommandRegistry::default();

        assert_eq!(registry.matching("").len(), 2);
        let ids: Vec<_> = registry.matching("ref").iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![REFRESH]);
        assert!(registry.matching("zzz").is_empty());
    }
}
