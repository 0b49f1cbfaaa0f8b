//! Server selectors.
//!
//! Every operation is scoped either to all servers sharing the database or to
//! one server identified by its tag. Rows written for all servers carry the
//! reserved tag [`ALL_SERVERS_TAG`].

use std::fmt;

/// Tag stored on rows visible to every server.
pub const ALL_SERVERS_TAG: &str = "all";

/// Visibility scope of an operation or a stored entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum ServerSelector {
    #[default]
    AllServers,
    OneServer(String),
}

impl ServerSelector {
    /// Selector for a single server.
    pub fn one(tag: impl Into<String>) -> Self {
        ServerSelector::OneServer(tag.into())
    }

    /// Build a selector from a stored tag.
    pub fn from_tag(tag: &str) -> Self {
        if tag == ALL_SERVERS_TAG {
            ServerSelector::AllServers
        } else {
            ServerSelector::OneServer(tag.to_string())
        }
    }

    /// Tag written to (and matched exactly by deletes on) rows in this scope.
    pub fn tag(&self) -> &str {
        match self {
            ServerSelector::AllServers => ALL_SERVERS_TAG,
            ServerSelector::OneServer(tag) => tag,
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, ServerSelector::AllServers)
    }

    /// The pair of tags a read under this selector may see.
    ///
    /// All-servers rows are visible to every server; a server's own rows are
    /// never visible to an all-servers read.
    pub(crate) fn visible_tags(&self) -> (&str, &str) {
        (ALL_SERVERS_TAG, self.tag())
    }
}

impl fmt::Display for ServerSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerSelector::AllServers => write!(f, "all servers"),
            ServerSelector::OneServer(tag) => write!(f, "server '{}'", tag),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_tags() {
        assert_eq!(ServerSelector::AllServers.tag(), "all");
        assert_eq!(ServerSelector::one("server1").tag(), "server1");
        assert_eq!(ServerSelector::from_tag("all"), ServerSelector::AllServers);
        assert_eq!(
            ServerSelector::from_tag("server1"),
            ServerSelector::one("server1")
        );
    }

    #[test]
    fn test_selector_visibility() {
        assert_eq!(ServerSelector::AllServers.visible_tags(), ("all", "all"));
        assert_eq!(
            ServerSelector::one("server1").visible_tags(),
            ("all", "server1")
        );
    }
}
