//! Task-type tags and the credential pools they select.

use std::collections::HashMap;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize};

/// Label partitioning the credential pools.
///
/// Unknown tags deserialize to the default (`dashboard`) so callers never fail
/// on an unrecognized tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Analyzer,
    #[default]
    Dashboard,
    Food,
    Tools,
}

impl TaskType {
    pub const ALL: [TaskType; 4] = [
        TaskType::Analyzer,
        TaskType::Dashboard,
        TaskType::Food,
        TaskType::Tools,
    ];

    /// Parse a wire tag, falling back to the default pool's tag.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "analyzer" => Self::Analyzer,
            "dashboard" => Self::Dashboard,
            "food" => Self::Food,
            "tools" => Self::Tools,
            _ => Self::default(),
        }
    }

    /// Prefix of the environment variables holding this pool's keys.
    pub fn env_prefix(&self) -> &'static str {
        match self {
            Self::Analyzer => "ANALYZER_GEM",
            Self::Dashboard => "DASHBOARD_GEM",
            Self::Food => "FOOD_GEM",
            Self::Tools => "TOOLS_GEM",
        }
    }
}

impl<'de> Deserialize<'de> for TaskType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = Option::<String>::deserialize(deserializer)?;
        Ok(tag.map(|t| Self::from_tag(&t)).unwrap_or_default())
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Analyzer => "analyzer",
            Self::Dashboard => "dashboard",
            Self::Food => "food",
            Self::Tools => "tools",
        };
        write!(f, "{s}")
    }
}

/// Ordered credential sequences per task type.
#[derive(Clone, Default)]
pub struct CredentialPools {
    pools: HashMap<TaskType, Vec<SecretString>>,
}

impl CredentialPools {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pool, dropping empty or whitespace-only entries.
    pub fn with_pool<I, S>(mut self, task_type: TaskType, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keys: Vec<SecretString> = keys
            .into_iter()
            .map(Into::<String>::into)
            .filter(|k| !k.trim().is_empty())
            .map(SecretString::from)
            .collect();
        self.pools.insert(task_type, keys);
        self
    }

    /// Credentials for `task_type`, or the default pool when the tag has none
    /// registered at all.
    pub fn for_task(&self, task_type: TaskType) -> &[SecretString] {
        self.pools
            .get(&task_type)
            .or_else(|| self.pools.get(&TaskType::default()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self, task_type: TaskType) -> usize {
        self.for_task(task_type).len()
    }

    /// Task types whose pool resolves to no credentials.
    pub fn empty_pools(&self) -> Vec<TaskType> {
        TaskType::ALL
            .into_iter()
            .filter(|t| self.for_task(*t).is_empty())
            .collect()
    }
}

impl std::fmt::Debug for CredentialPools {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for t in TaskType::ALL {
            map.entry(&t, &self.len(t));
        }
        map.finish()
    }
}

/// Last four characters of a credential, for log and error messages.
pub fn mask_suffix(credential: &SecretString) -> String {
    let chars: Vec<char> = credential.expose_secret().chars().collect();
    let start = chars.len().saturating_sub(4);
    chars[start..].iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_tag_falls_back_to_default() {
        assert_eq!(TaskType::from_tag("recipes"), TaskType::Dashboard);
        assert_eq!(TaskType::from_tag(""), TaskType::Dashboard);
        assert_eq!(TaskType::from_tag("Tools"), TaskType::Tools);
    }

    #[test]
    fn deserialize_tolerates_unknown_and_null() {
        let t: TaskType = serde_json::from_str("\"nope\"").unwrap();
        assert_eq!(t, TaskType::Dashboard);
        let t: TaskType = serde_json::from_str("null").unwrap();
        assert_eq!(t, TaskType::Dashboard);
        let t: TaskType = serde_json::from_str("\"food\"").unwrap();
        assert_eq!(t, TaskType::Food);
    }

    #[test]
    fn empty_entries_filtered() {
        let pools = CredentialPools::new().with_pool(TaskType::Tools, ["k1", "", "  ", "k2"]);
        assert_eq!(pools.len(TaskType::Tools), 2);
        assert_eq!(pools.for_task(TaskType::Tools)[1].expose_secret(), "k2");
    }

    #[test]
    fn missing_pool_uses_default() {
        let pools = CredentialPools::new().with_pool(TaskType::Dashboard, ["dash-key"]);
        assert_eq!(pools.for_task(TaskType::Food)[0].expose_secret(), "dash-key");
        assert!(pools.empty_pools().is_empty());
    }

    #[test]
    fn registered_but_empty_pool_does_not_fall_back() {
        let pools = CredentialPools::new()
            .with_pool(TaskType::Dashboard, ["dash-key"])
            .with_pool(TaskType::Food, [""]);
        assert!(pools.for_task(TaskType::Food).is_empty());
        assert_eq!(pools.empty_pools(), vec![TaskType::Food]);
    }

    #[test]
    fn mask_suffix_keeps_last_four() {
        assert_eq!(mask_suffix(&SecretString::from("AIzaSy-1234")), "1234");
        assert_eq!(mask_suffix(&SecretString::from("ab")), "ab");
    }

    #[test]
    fn debug_does_not_print_keys() {
        let pools = CredentialPools::new().with_pool(TaskType::Tools, ["super-secret"]);
        assert!(!format!("{pools:?}").contains("super-secret"));
    }
}
