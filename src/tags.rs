use std::collections::HashMap;

pub const REQUIRED_TAGS: [&str; 6] = ["artist", "title", "genre", "album", "tracknumber", "date"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tags {
    values: HashMap<String, String>,
}

impl Tags {
    /// Parses `KEY=value` lines as printed by `metaflac --export-tags-to=-`.
    pub fn parse(output: &str) -> Self {
        let mut tags = Self::default();
        for line in output.lines() {
            let line = line.replace('"', "'");
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            tags.insert(key, value);
        }
        tags
    }

    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        self.values.insert(key.to_lowercase(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(&key.to_lowercase()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn first_missing(&self, required: &[&'static str]) -> Option<&'static str> {
        required
            .iter()
            .copied()
            .find(|tag| self.get(tag).is_none_or(str::is_empty))
    }
}
