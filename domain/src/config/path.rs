//! Group paths within a channel configuration tree

use serde::{Deserialize, Serialize};

/// Name of the root group of every channel configuration
pub const CHANNEL_GROUP: &str = "Channel";
/// Name of the application organizations group
pub const APPLICATION_GROUP: &str = "Application";
/// Name of the ordering organizations group
pub const ORDERER_GROUP: &str = "Orderer";

/// Slash-separated path to a config group, always rooted at `Channel`
///
/// Ordering is segment-wise, so a parent always sorts before its children.
///
/// # Example
///
/// ```
/// use chanconf_domain::config::GroupPath;
///
/// let org = GroupPath::application().child("Org1");
/// assert_eq!(org.to_string(), "Channel/Application/Org1");
/// assert_eq!(org.parent(), Some(GroupPath::application()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct GroupPath(Vec<String>);

impl GroupPath {
    /// The `Channel` root path
    pub fn root() -> Self {
        Self(vec![CHANNEL_GROUP.to_string()])
    }

    /// `Channel/Application`
    pub fn application() -> Self {
        Self::root().child(APPLICATION_GROUP)
    }

    /// `Channel/Orderer`
    pub fn orderer() -> Self {
        Self::root().child(ORDERER_GROUP)
    }

    /// Path of a direct child group
    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(name.into());
        Self(segments)
    }

    /// Path of the parent group, `None` for the root
    pub fn parent(&self) -> Option<Self> {
        if self.0.len() <= 1 {
            return None;
        }
        Some(Self(self.0[..self.0.len() - 1].to_vec()))
    }

    /// Last segment (the group's own name)
    pub fn name(&self) -> &str {
        self.0.last().map(String::as_str).unwrap_or(CHANNEL_GROUP)
    }

    /// Segments below the root, used to walk down from the `Channel` group
    pub fn below_root(&self) -> &[String] {
        &self.0[1..]
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }
}

impl std::fmt::Display for GroupPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

impl From<GroupPath> for String {
    fn from(path: GroupPath) -> Self {
        path.to_string()
    }
}

impl TryFrom<String> for GroupPath {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl std::str::FromStr for GroupPath {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let segments: Vec<String> = s
            .trim_start_matches('/')
            .split('/')
            .map(str::to_string)
            .collect();

        if segments.first().map(String::as_str) != Some(CHANNEL_GROUP) {
            return Err(format!("Group path must start with '{}': {}", CHANNEL_GROUP, s));
        }
        if segments.iter().any(|seg| seg.is_empty()) {
            return Err(format!("Group path has an empty segment: {}", s));
        }
        Ok(Self(segments))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_parse() {
        let path = GroupPath::orderer().child("OrdererOrg");
        assert_eq!(path.to_string(), "Channel/Orderer/OrdererOrg");
        assert_eq!("Channel/Orderer/OrdererOrg".parse::<GroupPath>().unwrap(), path);
        assert_eq!("/Channel/Orderer".parse::<GroupPath>().unwrap(), GroupPath::orderer());
    }

    #[test]
    fn test_parse_rejects_foreign_root() {
        assert!("Orderer/Org1".parse::<GroupPath>().is_err());
        assert!("Channel//Org1".parse::<GroupPath>().is_err());
    }

    #[test]
    fn test_parent_sorts_before_child() {
        let parent = GroupPath::application();
        let child = parent.child("Org1");
        assert!(parent < child);
        assert!(GroupPath::root() < parent);
        assert_eq!(GroupPath::root().parent(), None);
    }

    #[test]
    fn test_serializes_as_map_key() {
        let mut map = std::collections::BTreeMap::new();
        map.insert(GroupPath::orderer(), 3u64);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"Channel/Orderer":3}"#);
    }
}
