//! Encryption authority resolution
//!
//! Decides, on every poll, which API group-resources this operator must keep
//! encrypted at rest when an auxiliary API server can take over a subset of
//! them. The handoff is signalled through a single coordination secret:
//! - absent, unreadable, or annotated: this operator manages the full list
//! - present without the annotation: the auxiliary server's subset is dropped
//!
//! Changes to the managed list are reported once through a [`ChangeNotifier`].

#![deny(missing_docs)]

pub mod cache;
pub mod change;
pub mod config;
pub mod group_resource;
pub mod lookup;
pub mod notify;
pub mod provider;

pub use cache::SecretCache;
pub use change::{ChangeDetector, GroupResourceDiff};
pub use config::ProviderConfig;
pub use group_resource::GroupResource;
pub use lookup::{LookupError, SecretLookup};
pub use notify::{forward_events, ChangeEvent, ChangeNotifier, ChannelNotifier};
pub use provider::{Authority, AuthorityResolver, EncryptionProvider};
