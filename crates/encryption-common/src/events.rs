//! Kubernetes Event recording for the encryption operator.
//!
//! Change notifications become standard Kubernetes Events on the operator's
//! own object, so `kubectl describe deployment/encryption-operator` shows when
//! the managed group-resource list moved.
//!
//! Publishing is fire-and-forget: failures are logged as warnings and never
//! propagate. A lost event must never affect which resources get encrypted.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::runtime::events::{Event, EventType, Recorder, Reporter};
use kube::Client;
use tracing::warn;

/// Trait for publishing Kubernetes Events about the operator.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish an event with a machine-readable reason and a message
    async fn publish(&self, type_: EventType, reason: &str, note: String);
}

/// Reference to the object events are recorded on
pub fn object_reference(
    api_version: &str,
    kind: &str,
    name: &str,
    namespace: &str,
) -> ObjectReference {
    ObjectReference {
        api_version: Some(api_version.to_string()),
        kind: Some(kind.to_string()),
        name: Some(name.to_string()),
        namespace: Some(namespace.to_string()),
        ..Default::default()
    }
}

/// Publisher that records every event on one fixed object.
pub struct KubeEventPublisher {
    recorder: Recorder,
    target: ObjectReference,
}

impl KubeEventPublisher {
    /// Create a publisher reporting as `controller_name` on `target`.
    pub fn new(client: Client, controller_name: &str, target: ObjectReference) -> Self {
        let reporter = Reporter {
            controller: controller_name.to_string(),
            instance: std::env::var("POD_NAME").ok(),
        };
        Self {
            recorder: Recorder::new(client, reporter),
            target,
        }
    }
}

#[async_trait]
impl EventPublisher for KubeEventPublisher {
    async fn publish(&self, type_: EventType, reason: &str, note: String) {
        let event = Event {
            type_,
            reason: reason.to_string(),
            note: Some(note),
            action: actions::RECONCILE.to_string(),
            secondary: None,
        };
        if let Err(e) = self.recorder.publish(&event, &self.target).await {
            warn!(
                reason,
                object = ?self.target.name,
                error = %e,
                "Failed to publish Kubernetes event"
            );
        }
    }
}

/// Well-known event reason strings.
pub mod reasons {
    /// The set of group-resources this operator encrypts has changed
    pub const ENCRYPTED_GRS_CHANGED: &str = "EncryptedGRsChanged";
}

/// Well-known event action strings.
pub mod actions {
    /// Standard reconciliation pass
    pub const RECONCILE: &str = "Reconcile";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_reference_names_the_operator() {
        let target = object_reference(
            "apps/v1",
            "Deployment",
            "encryption-operator",
            "openshift-apiserver-operator",
        );
        assert_eq!(target.api_version.as_deref(), Some("apps/v1"));
        assert_eq!(target.kind.as_deref(), Some("Deployment"));
        assert_eq!(target.name.as_deref(), Some("encryption-operator"));
        assert_eq!(
            target.namespace.as_deref(),
            Some("openshift-apiserver-operator")
        );
        assert!(target.uid.is_none());
    }

    #[test]
    fn reason_matches_wire_value() {
        assert_eq!(reasons::ENCRYPTED_GRS_CHANGED, "EncryptedGRsChanged");
    }
}
