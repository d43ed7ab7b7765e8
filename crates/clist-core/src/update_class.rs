#![forbid(unsafe_code)]

//! Update classification attached to each delivered snapshot.
//!
//! The data source tags every snapshot with the reason it changed. The
//! reconciler uses the tag as the first input to its incremental-vs-rebuild
//! decision: some classes are structurally unsafe for incremental patching
//! and always force a full rebuild of the visual surface.

use std::fmt;

/// Why a snapshot was delivered.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum UpdateClass {
    /// Ordinary model change (send, receive, edit, delete).
    Normal,
    /// The very first snapshot for this surface. Processed synchronously on
    /// the affinity thread to avoid an initial empty-content flash.
    FirstLoad,
    /// An older page of history was loaded.
    Pagination,
    /// The entire model was refreshed from scratch.
    Reload,
    /// The retained history was truncated (pagination-class shrink).
    Shrink,
}

impl UpdateClass {
    /// Whether this class always takes the full-rebuild path, regardless of
    /// what the consistency check would say.
    #[must_use]
    pub fn forces_rebuild(self) -> bool {
        matches!(self, Self::Reload | Self::Shrink)
    }
}

impl fmt::Display for UpdateClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => f.write_str("normal"),
            Self::FirstLoad => f.write_str("first-load"),
            Self::Pagination => f.write_str("pagination"),
            Self::Reload => f.write_str("reload"),
            Self::Shrink => f.write_str("shrink"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reload_and_shrink_force_rebuild() {
        assert!(UpdateClass::Reload.forces_rebuild());
        assert!(UpdateClass::Shrink.forces_rebuild());
    }

    #[test]
    fn incremental_capable_classes() {
        assert!(!UpdateClass::Normal.forces_rebuild());
        assert!(!UpdateClass::FirstLoad.forces_rebuild());
        assert!(!UpdateClass::Pagination.forces_rebuild());
    }

    #[test]
    fn display_names() {
        assert_eq!(UpdateClass::FirstLoad.to_string(), "first-load");
        assert_eq!(UpdateClass::Shrink.to_string(), "shrink");
    }
}
