//! Immutable mapping from feed team names to display names.

use std::collections::BTreeMap;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::snapshot::MatchStatSnapshot;

#[derive(Debug, Clone, Default)]
pub struct TeamNames {
    by_alias: FxHashMap<String, String>,
}
impl TeamNames {
    /// Builds the table from `(feed name, display name)` pairs. Display names map to themselves.
    pub fn new<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut by_alias = FxHashMap::default();
        for (alias, display) in pairs {
            by_alias.insert(key(display), display.to_string());
            by_alias.insert(key(alias), display.to_string());
        }
        Self { by_alias }
    }

    /// Parses a JSON object of `{"feed name": "display name"}`.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let pairs: BTreeMap<String, String> = serde_json::from_str(json)?;
        Ok(Self::new(pairs.iter().map(|(alias, display)| (alias.as_str(), display.as_str()))))
    }

    pub fn normalise(&self, name: &str) -> Option<&str> {
        self.by_alias.get(&key(name)).map(String::as_str)
    }

    pub fn recognised(&self) -> FxHashSet<String> {
        self.by_alias.values().cloned().collect()
    }

    /// Rewrites both team names of `snapshot` to their display form, leaving unknown names untouched.
    pub fn normalise_snapshot(&self, snapshot: &mut MatchStatSnapshot) {
        for side in [&mut snapshot.home, &mut snapshot.away] {
            if let Some(display) = self.normalise(&side.team) {
                side.team = display.to_string();
            }
        }
    }
}

fn key(name: &str) -> String {
    name.trim().to_lowercase()
}
