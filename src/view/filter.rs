use regex::{Regex, RegexBuilder};

use crate::model::PluginEntry;

/// Case-insensitive substring filter over plugin id and extension name.
#[derive(Debug, Clone)]
pub struct EntryFilter {
    matcher: Matcher,
}

#[derive(Debug, Clone)]
enum Matcher {
    All,
    Pattern(Regex),
    /// Lowercased query, used when the escaped pattern exceeds the regex limits.
    Folded(String),
}

impl EntryFilter {
    pub fn new(query: &str) -> Self {
        if query.is_empty() {
            return Self {
                matcher: Matcher::All,
            };
        }

        let matcher = match RegexBuilder::new(&regex::escape(query))
            .case_insensitive(true)
            .build()
        {
            Ok(pattern) => Matcher::Pattern(pattern),
            Err(err) => {
                tracing::debug!("filter falls back to plain matching: {err}");
                Matcher::Folded(query.to_lowercase())
            }
        };
        Self { matcher }
    }

    pub fn matches(&self, entry: &PluginEntry) -> bool {
        match &self.matcher {
            Matcher::All => true,
            Matcher::Pattern(pattern) => {
                pattern.is_match(&entry.id) || pattern.is_match(&entry.extension)
            }
            Matcher::Folded(needle) => {
                entry.id.to_lowercase().contains(needle.as_str())
                    || entry.extension.to_lowercase().contains(needle.as_str())
            }
        }
    }
}

/// Entries matching `query`, in their original order.
pub fn filter_entries<'a>(entries: &'a [PluginEntry], query: &str) -> Vec<&'a PluginEntry> {
    let filter = EntryFilter::new(query);
    entries.iter().filter(|entry| filter.matches(entry)).collect()
}
