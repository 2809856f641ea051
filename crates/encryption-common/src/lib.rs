//! Common types for the encryption provider: errors, events, telemetry, and
//! the well-known names of the coordination secret.

#![deny(missing_docs)]

pub mod error;
pub mod events;
pub mod telemetry;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Base name of the secret carrying an API server's encryption configuration.
///
/// The coordination secret for a target namespace is named
/// `<ENCRYPTION_CONFIG_SECRET_NAME>-<target-namespace>`.
pub const ENCRYPTION_CONFIG_SECRET_NAME: &str = "encryption-config";

/// Namespace holding the operator-managed copies of encryption configuration
pub const DEFAULT_CONFIG_NAMESPACE: &str = "openshift-config-managed";

/// Namespace of the auxiliary API server that may take over encryption
pub const DEFAULT_TARGET_NAMESPACE: &str = "openshift-oauth-apiserver";

/// Annotation whose presence on the coordination secret keeps this operator in charge
pub const DEFAULT_MANAGED_BY_ANNOTATION: &str =
    "encryption.apiserver.operator.openshift.io/managed-by";

/// Build the coordination secret name for the given target namespace
pub fn coordination_secret_name(target_namespace: &str) -> String {
    format!("{}-{}", ENCRYPTION_CONFIG_SECRET_NAME, target_namespace)
}
