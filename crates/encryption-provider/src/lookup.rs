//! Secret lookup capability
//!
//! The resolver only needs to read one secret from a locally maintained
//! cache. Reads never hit the network, so the capability is synchronous.

use std::sync::Arc;

use k8s_openapi::api::core::v1::Secret;
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

/// Why a secret could not be returned
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    /// The secret does not exist in the cache
    #[error("secret {namespace}/{name} not found")]
    NotFound {
        /// Namespace that was searched
        namespace: String,
        /// Name that was looked up
        name: String,
    },

    /// The cache has not completed its initial list yet
    #[error("secret cache for namespace {namespace} has not synced")]
    NotSynced {
        /// Namespace the cache serves
        namespace: String,
    },

    /// The cache does not serve the requested namespace
    #[error("secret cache serves namespace {served}, not {requested}")]
    WrongNamespace {
        /// Namespace the cache serves
        served: String,
        /// Namespace that was requested
        requested: String,
    },
}

impl LookupError {
    /// Whether this is a genuine absence rather than a cache problem
    pub fn is_not_found(&self) -> bool {
        matches!(self, LookupError::NotFound { .. })
    }
}

/// Read access to secrets held in a local cache
#[cfg_attr(test, automock)]
pub trait SecretLookup: Send + Sync {
    /// Get a secret by name and namespace
    fn lookup(&self, name: &str, namespace: &str) -> Result<Arc<Secret>, LookupError>;
}

impl<T: SecretLookup + ?Sized> SecretLookup for Arc<T> {
    fn lookup(&self, name: &str, namespace: &str) -> Result<Arc<Secret>, LookupError> {
        (**self).lookup(name, namespace)
    }
}

/// Whether the secret carries the given annotation key, regardless of value
pub fn has_annotation(secret: &Secret, key: &str) -> bool {
    secret
        .metadata
        .annotations
        .as_ref()
        .map(|annotations| annotations.contains_key(key))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use std::collections::BTreeMap;

    fn secret_with_annotations(annotations: Option<BTreeMap<String, String>>) -> Secret {
        Secret {
            metadata: ObjectMeta {
                name: Some("encryption-config-openshift-oauth-apiserver".to_string()),
                annotations,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn annotation_presence_ignores_value() {
        let key = "encryption.apiserver.operator.openshift.io/managed-by";
        let secret = secret_with_annotations(Some(BTreeMap::from([(
            key.to_string(),
            String::new(),
        )])));
        assert!(has_annotation(&secret, key));
    }

    #[test]
    fn missing_annotations_map_means_absent() {
        let secret = secret_with_annotations(None);
        assert!(!has_annotation(&secret, "any"));
    }

    #[test]
    fn other_annotations_do_not_count() {
        let secret = secret_with_annotations(Some(BTreeMap::from([(
            "unrelated".to_string(),
            "true".to_string(),
        )])));
        assert!(!has_annotation(&secret, "managed-by"));
    }

    #[test]
    fn only_not_found_is_not_found() {
        let not_found = LookupError::NotFound {
            namespace: "ns".to_string(),
            name: "s".to_string(),
        };
        let not_synced = LookupError::NotSynced {
            namespace: "ns".to_string(),
        };
        assert!(not_found.is_not_found());
        assert!(!not_synced.is_not_found());
        assert_eq!(not_found.to_string(), "secret ns/s not found");
    }
}
