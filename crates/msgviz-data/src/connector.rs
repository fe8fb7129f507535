//! The seam between source-specific pullers and the aggregation engine.
//!
//! A connector retrieves messages from one communication source and hands
//! them over as a [`MessageArchive`] of normalized [`Message`] records: a
//! fixed medium tag for the source and a stable identity per correspondent.
//!
//! [`Message`]: msgviz_core::models::Message

use msgviz_core::error::Result;
use msgviz_core::models::MessageArchive;
use tracing::{info, warn};

use crate::merger::ArchiveMerger;

/// A source of normalized messages.
pub trait Connector {
    /// Human-readable label recorded as the archive's source.
    fn label(&self) -> &str;

    /// Retrieve every message this source can provide.
    fn pull(&self) -> Result<MessageArchive>;
}

/// Pull from every connector and merge the results.
///
/// A connector that fails is logged and skipped so that one broken source
/// does not hide the others.
pub fn pull_all(connectors: &[Box<dyn Connector>]) -> MessageArchive {
    let mut archives = Vec::with_capacity(connectors.len());
    for connector in connectors {
        match connector.pull() {
            Ok(archive) => {
                info!(
                    "Pulled {} messages from {}",
                    archive.len(),
                    connector.label()
                );
                archives.push(archive);
            }
            Err(e) => warn!("Skipping source {}: {}", connector.label(), e),
        }
    }
    ArchiveMerger::merge_all(&archives)
}
