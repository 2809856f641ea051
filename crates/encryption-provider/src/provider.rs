//! Authority resolution between this operator and the auxiliary API server
//!
//! Each poll reads the coordination secret
//! `<configNamespace>/encryption-config-<targetNamespace>` and decides who
//! encrypts what:
//!
//! - secret missing, unreadable, or carrying the annotation key: this operator
//!   is in charge and manages the full configured list
//! - secret present without the annotation: the auxiliary API server has taken
//!   over its externally manageable resources, and this operator manages the
//!   rest
//!
//! Every ambiguous observation resolves toward the full list. Claiming a
//! resource the other side already encrypts is recoverable; dropping one is
//! not.

use std::collections::BTreeSet;

use tracing::{debug, instrument, warn};

use encryption_common::Result;

use crate::change::ChangeDetector;
use crate::config::ProviderConfig;
use crate::group_resource::GroupResource;
use crate::lookup::{has_annotation, SecretLookup};
use crate::notify::ChangeNotifier;

/// Source of the group-resources the encryption controllers must manage
pub trait EncryptionProvider {
    /// Group-resources to keep encrypted, in configured order
    fn encrypted_group_resources(&mut self) -> Vec<GroupResource>;

    /// Whether external preconditions allow the encryption controllers to sync
    fn should_run_encryption_controllers(&self) -> Result<bool>;
}

/// Who is responsible for the externally manageable resources this poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authority {
    /// This operator encrypts the full list
    Primary,
    /// The auxiliary API server encrypts its externally manageable subset
    Delegated,
}

/// Decides the managed list from the coordination secret
pub struct AuthorityResolver<L, N> {
    config_namespace: String,
    secret_name: String,
    annotation_key: String,
    all_resources: Vec<GroupResource>,
    externally_managed: BTreeSet<String>,
    lookup: L,
    detector: ChangeDetector<N>,
}

impl<L: SecretLookup, N: ChangeNotifier> AuthorityResolver<L, N> {
    /// Create a resolver from validated configuration
    pub fn new(config: &ProviderConfig, lookup: L, notifier: N) -> Self {
        Self {
            config_namespace: config.config_namespace.clone(),
            secret_name: config.coordination_secret_name(),
            annotation_key: config.annotation_key.clone(),
            all_resources: config.encrypted_resources.clone(),
            externally_managed: config.externally_managed_set(),
            lookup,
            detector: ChangeDetector::new(notifier),
        }
    }

    /// Name of the coordination secret this resolver reads
    pub fn secret_name(&self) -> &str {
        &self.secret_name
    }

    /// Observe the coordination secret and decide who is in charge
    pub fn authority(&self) -> Authority {
        let secret = match self.lookup.lookup(&self.secret_name, &self.config_namespace) {
            Ok(secret) => secret,
            Err(e) if e.is_not_found() => {
                debug!(secret = %self.secret_name, "Coordination secret absent, managing full list");
                return Authority::Primary;
            }
            Err(e) => {
                warn!(
                    secret = %self.secret_name,
                    error = %e,
                    "Coordination secret unavailable, managing full list"
                );
                return Authority::Primary;
            }
        };

        if has_annotation(&secret, &self.annotation_key) {
            debug!(
                secret = %self.secret_name,
                annotation = %self.annotation_key,
                "Coordination secret annotated, managing full list"
            );
            return Authority::Primary;
        }

        Authority::Delegated
    }

    /// The configured list without externally manageable resources
    fn reduced_resources(&self) -> Vec<GroupResource> {
        self.all_resources
            .iter()
            .filter(|gr| !self.externally_managed.contains(&gr.canonical()))
            .cloned()
            .collect()
    }
}

impl<L: SecretLookup, N: ChangeNotifier> EncryptionProvider for AuthorityResolver<L, N> {
    #[instrument(skip(self), fields(secret = %self.secret_name))]
    fn encrypted_group_resources(&mut self) -> Vec<GroupResource> {
        match self.authority() {
            Authority::Primary => self.all_resources.clone(),
            Authority::Delegated => {
                let reduced = self.reduced_resources();
                debug!(managed = reduced.len(), "Auxiliary API server in charge of its resources");
                self.detector.update(reduced).to_vec()
            }
        }
    }

    fn should_run_encryption_controllers(&self) -> Result<bool> {
        // No preconditions yet; extension point for e.g. a cluster-wide flag.
        Ok(true)
    }
}
