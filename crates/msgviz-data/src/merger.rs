//! Combining per-source archives into one dataset.

use std::collections::BTreeSet;

use msgviz_core::models::MessageArchive;
use tracing::debug;

/// Stateless helper that unions message archives.
///
/// Combination is plain concatenation: nothing is deduplicated, so the same
/// message pulled from two sources is counted twice.  The resulting multiset
/// does not depend on argument order or grouping, and the empty archive is
/// the identity.
pub struct ArchiveMerger;

impl ArchiveMerger {
    /// A new archive holding every message of `a` followed by every message
    /// of `b`, with the union of both source sets.
    pub fn combine(a: &MessageArchive, b: &MessageArchive) -> MessageArchive {
        let sources: BTreeSet<String> = a.sources().union(b.sources()).cloned().collect();
        let mut messages = Vec::with_capacity(a.len() + b.len());
        messages.extend_from_slice(a.messages());
        messages.extend_from_slice(b.messages());
        MessageArchive::with_sources(sources, messages)
    }

    /// Fold any number of archives into one.  No archives yields an empty
    /// archive.
    pub fn merge_all<'a, I>(archives: I) -> MessageArchive
    where
        I: IntoIterator<Item = &'a MessageArchive>,
    {
        let mut sources = BTreeSet::new();
        let mut messages = Vec::new();
        let mut merged = 0usize;
        for archive in archives {
            sources.extend(archive.sources().iter().cloned());
            messages.extend_from_slice(archive.messages());
            merged += 1;
        }
        debug!(
            "Merged {} archives into {} messages from {} sources",
            merged,
            messages.len(),
            sources.len()
        );
        MessageArchive::with_sources(sources, messages)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
