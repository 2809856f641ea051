//! Change detection for the managed group-resource list
//!
//! Membership is compared as sets of canonical strings, so reordering the
//! configured list never counts as a change. The held list keeps the order it
//! was supplied in, so callers see a stable sequence across polls.

use std::collections::BTreeSet;

use tracing::info;

use encryption_common::events::reasons;

use crate::group_resource::{canonical_set, GroupResource};
use crate::notify::ChangeNotifier;

/// Membership difference between two group-resource lists
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupResourceDiff {
    /// Present in the new list only
    pub added: BTreeSet<String>,
    /// Present in the old list only
    pub removed: BTreeSet<String>,
    /// Every member of the new list
    pub new_set: BTreeSet<String>,
}

impl GroupResourceDiff {
    /// Compare two lists by membership
    pub fn between(old: &[GroupResource], new: &[GroupResource]) -> Self {
        let old_set = canonical_set(old);
        let new_set = canonical_set(new);
        Self {
            added: new_set.difference(&old_set).cloned().collect(),
            removed: old_set.difference(&new_set).cloned().collect(),
            new_set,
        }
    }

    /// Whether membership differs
    pub fn has_changes(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty()
    }
}

/// Render the notification message for a newly managed set
///
/// Members are sorted and space-separated: `[a b c]`.
pub fn change_message(new_set: &BTreeSet<String>) -> String {
    let members: Vec<&str> = new_set.iter().map(String::as_str).collect();
    format!(
        "The new GroupResource list this operator will manage is [{}]",
        members.join(" ")
    )
}

/// Holds the last managed list and reports when its membership changes
pub struct ChangeDetector<N> {
    current: Vec<GroupResource>,
    notifier: N,
}

impl<N: ChangeNotifier> ChangeDetector<N> {
    /// Create a detector with an empty held list
    pub fn new(notifier: N) -> Self {
        Self {
            current: Vec::new(),
            notifier,
        }
    }

    /// The currently held list
    pub fn current(&self) -> &[GroupResource] {
        &self.current
    }

    /// Replace the held list if `new` differs by membership
    ///
    /// Emits exactly one notification naming the full new set when a change
    /// is detected, and none otherwise. Returns the held list.
    pub fn update(&mut self, new: Vec<GroupResource>) -> &[GroupResource] {
        let diff = GroupResourceDiff::between(&self.current, &new);
        if diff.has_changes() {
            info!(
                added = ?diff.added,
                removed = ?diff.removed,
                "Managed group-resource list changed"
            );
            self.notifier
                .notify(reasons::ENCRYPTED_GRS_CHANGED, change_message(&diff.new_set));
            self.current = new;
        }
        &self.current
    }
}
