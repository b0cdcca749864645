//! Per-file access graph: who holds access and who granted it
//!
//! Every principal except the owner has exactly one granter, so the graph is
//! a tree rooted at the owner. Revoking a user removes the whole subtree
//! below them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Grant {
    pub grantee: String,
    pub granter: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessGraph {
    /// grantee → granter
    grants: BTreeMap<String, String>,
}

impl AccessGraph {
    pub fn contains(&self, user: &str) -> bool {
        self.grants.contains_key(user)
    }

    pub fn granter_of(&self, user: &str) -> Option<&str> {
        self.grants.get(user).map(String::as_str)
    }

    /// Record that `granter` gave `grantee` access. Replaces any earlier
    /// grant to the same user.
    pub fn grant(&mut self, grantee: &str, granter: &str) {
        self.grants.insert(grantee.to_string(), granter.to_string());
    }

    pub fn grants(&self) -> Vec<Grant> {
        self.grants
            .iter()
            .map(|(grantee, granter)| Grant {
                grantee: grantee.clone(),
                granter: granter.clone(),
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }

    /// Remove `user` and everyone whose grant chain passes through them.
    ///
    /// Returns the removed grants, `user`'s own first.
    pub fn revoke(&mut self, user: &str) -> Vec<Grant> {
        let mut removed = Vec::new();
        let mut pending = vec![user.to_string()];

        while let Some(current) = pending.pop() {
            let Some(granter) = self.grants.remove(&current) else {
                continue;
            };
            pending.extend(
                self.grants
                    .iter()
                    .filter(|(_, g)| **g == current)
                    .map(|(grantee, _)| grantee.clone()),
            );
            removed.push(Grant {
                grantee: current,
                granter,
            });
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// alice → bob → dave, alice → carol, bob → erin → frank
    fn sample() -> AccessGraph {
        let mut g = AccessGraph::default();
        g.grant("bob", "alice");
        g.grant("carol", "alice");
        g.grant("dave", "bob");
        g.grant("erin", "bob");
        g.grant("frank", "erin");
        g
    }

    #[test]
    fn test_grant_and_lookup() {
        let g = sample();
        assert!(g.contains("dave"));
        assert!(!g.contains("alice"), "owner is implicit");
        assert_eq!(g.granter_of("frank"), Some("erin"));
        assert_eq!(g.granter_of("zoe"), None);
        assert_eq!(g.grants().len(), 5);
    }

    #[test]
    fn test_revoke_is_transitive() {
        let mut g = sample();
        let removed = g.revoke("bob");

        assert_eq!(removed[0].grantee, "bob");
        let mut names: Vec<_> = removed.iter().map(|r| r.grantee.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["bob", "dave", "erin", "frank"]);

        assert_eq!(
            g.grants(),
            vec![Grant {
                grantee: "carol".into(),
                granter: "alice".into()
            }]
        );
    }

    #[test]
    fn test_revoke_leaf_leaves_siblings() {
        let mut g = sample();
        let removed = g.revoke("dave");
        assert_eq!(removed.len(), 1);
        assert!(g.contains("erin"));
        assert!(g.contains("frank"));
    }

    #[test]
    fn test_revoke_unknown_is_noop() {
        let mut g = sample();
        assert!(g.revoke("zoe").is_empty());
        assert_eq!(g, sample());
    }

    #[test]
    fn test_serde_roundtrip_keeps_order() {
        let g = sample();
        let json = serde_json::to_string(&g).unwrap();
        let parsed: AccessGraph = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, g);
    }
}
