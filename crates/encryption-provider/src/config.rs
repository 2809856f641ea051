//! Static configuration for the authority resolver
//!
//! Loaded once at startup from YAML and never mutated afterwards:
//!
//! ```yaml
//! configNamespace: openshift-config-managed
//! targetNamespace: openshift-oauth-apiserver
//! annotationKey: encryption.apiserver.operator.openshift.io/managed-by
//! encryptedResources:
//!   - routes.route.openshift.io
//!   - oauthaccesstokens.oauth.openshift.io
//! externallyManagedResources:
//!   - oauthaccesstokens.oauth.openshift.io
//! ```

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use encryption_common::{
    coordination_secret_name, Error, Result, DEFAULT_CONFIG_NAMESPACE,
    DEFAULT_MANAGED_BY_ANNOTATION, DEFAULT_TARGET_NAMESPACE,
};

use crate::group_resource::{canonical_set, GroupResource};

/// Resolver configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderConfig {
    /// Namespace holding the coordination secret
    pub config_namespace: String,
    /// Namespace of the auxiliary API server; part of the secret name
    pub target_namespace: String,
    /// Annotation whose presence keeps this operator fully in charge
    pub annotation_key: String,
    /// Every group-resource this operator can encrypt, in priority order
    pub encrypted_resources: Vec<GroupResource>,
    /// Group-resources the auxiliary API server may take over
    pub externally_managed_resources: Vec<GroupResource>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        let routes = GroupResource::new("route.openshift.io", "routes");
        let access_tokens = GroupResource::new("oauth.openshift.io", "oauthaccesstokens");
        let authorize_tokens = GroupResource::new("oauth.openshift.io", "oauthauthorizetokens");
        Self {
            config_namespace: DEFAULT_CONFIG_NAMESPACE.to_string(),
            target_namespace: DEFAULT_TARGET_NAMESPACE.to_string(),
            annotation_key: DEFAULT_MANAGED_BY_ANNOTATION.to_string(),
            encrypted_resources: vec![routes, access_tokens.clone(), authorize_tokens.clone()],
            externally_managed_resources: vec![access_tokens, authorize_tokens],
        }
    }
}

impl ProviderConfig {
    /// Parse and validate a YAML document
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| Error::serialization(format!("invalid provider config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("failed to read {}: {}", path.display(), e)))?;
        Self::from_yaml(&data)
    }

    /// Check the invariants the resolver relies on
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("configNamespace", &self.config_namespace),
            ("targetNamespace", &self.target_namespace),
            ("annotationKey", &self.annotation_key),
        ] {
            if value.trim().is_empty() {
                return Err(Error::config_field(field, "must not be empty"));
            }
        }

        let mut seen = BTreeSet::new();
        for gr in &self.encrypted_resources {
            if !seen.insert(gr.canonical()) {
                return Err(Error::config_field(
                    "encryptedResources",
                    format!("duplicate entry '{}'", gr),
                ));
            }
        }
        Ok(())
    }

    /// Name of the coordination secret: `encryption-config-<targetNamespace>`
    pub fn coordination_secret_name(&self) -> String {
        coordination_secret_name(&self.target_namespace)
    }

    /// Canonical strings of the externally manageable group-resources
    pub fn externally_managed_set(&self) -> BTreeSet<String> {
        canonical_set(&self.externally_managed_resources)
    }
}
