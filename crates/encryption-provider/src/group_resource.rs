//! API resource kinds identified by (group, resource)
//!
//! The canonical string form matches what Kubernetes prints for a
//! `GroupResource`: `resource` for the core group, `resource.group` otherwise.
//! Canonical strings are the set keys for change detection and the form used
//! in configuration files.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use encryption_common::Error;

/// An API resource kind, e.g. `secrets` or `routes.route.openshift.io`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GroupResource {
    /// API group; empty for the core group
    pub group: String,
    /// Plural resource name
    pub resource: String,
}

impl GroupResource {
    /// Create a group-resource from its parts
    pub fn new(group: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            resource: resource.into(),
        }
    }

    /// Canonical string used for set membership
    pub fn canonical(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for GroupResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            f.write_str(&self.resource)
        } else {
            write!(f, "{}.{}", self.resource, self.group)
        }
    }
}

impl FromStr for GroupResource {
    type Err = Error;

    /// Parse `resource[.group]`, splitting at the first dot
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (resource, group) = match s.split_once('.') {
            Some((_, "")) => {
                return Err(Error::config(format!(
                    "invalid group-resource '{}': group after '.' is empty",
                    s
                )))
            }
            Some(parts) => parts,
            None => (s, ""),
        };
        if resource.is_empty() {
            return Err(Error::config(format!(
                "invalid group-resource '{}': resource name is empty",
                s
            )));
        }
        Ok(Self::new(group, resource))
    }
}

impl TryFrom<String> for GroupResource {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<GroupResource> for String {
    fn from(gr: GroupResource) -> Self {
        gr.to_string()
    }
}

/// Collect the canonical strings of the given group-resources
///
/// `BTreeSet` keeps iteration sorted, so anything rendered from it is
/// deterministic.
pub fn canonical_set<'a, I>(grs: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a GroupResource>,
{
    grs.into_iter().map(GroupResource::canonical).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_group_renders_resource_only() {
        let gr = GroupResource::new("", "secrets");
        assert_eq!(gr.to_string(), "secrets");
    }

    #[test]
    fn named_group_renders_resource_dot_group() {
        let gr = GroupResource::new("oauth.openshift.io", "oauthaccesstokens");
        assert_eq!(gr.canonical(), "oauthaccesstokens.oauth.openshift.io");
    }

    #[test]
    fn parse_splits_at_first_dot() {
        let gr: GroupResource = "routes.route.openshift.io".parse().unwrap();
        assert_eq!(gr, GroupResource::new("route.openshift.io", "routes"));

        let gr: GroupResource = "configmaps".parse().unwrap();
        assert_eq!(gr, GroupResource::new("", "configmaps"));
    }

    #[test]
    fn parse_rejects_empty_resource() {
        assert!("".parse::<GroupResource>().is_err());
        assert!(".apps".parse::<GroupResource>().is_err());
    }

    #[test]
    fn parse_rejects_trailing_dot() {
        let err = "routes.".parse::<GroupResource>().unwrap_err();
        assert!(err.to_string().contains("group after '.' is empty"));
        assert!("routes. ".parse::<GroupResource>().is_err());
    }

    #[test]
    fn serde_uses_canonical_string() {
        let grs: Vec<GroupResource> =
            serde_yaml::from_str("- secrets\n- oauthaccesstokens.oauth.openshift.io\n").unwrap();
        assert_eq!(
            grs,
            vec![
                GroupResource::new("", "secrets"),
                GroupResource::new("oauth.openshift.io", "oauthaccesstokens"),
            ]
        );

        let yaml = serde_yaml::to_string(&grs).unwrap();
        assert!(yaml.contains("oauthaccesstokens.oauth.openshift.io"));
    }

    #[test]
    fn canonical_set_ignores_order_and_duplicates() {
        let a = GroupResource::new("", "secrets");
        let b = GroupResource::new("route.openshift.io", "routes");
        let forward = canonical_set([&a, &b]);
        let backward = canonical_set([&b, &a, &b]);
        assert_eq!(forward, backward);
        assert_eq!(forward.len(), 2);
    }
}
