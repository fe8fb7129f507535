//! Aggregation layer for msgviz.
//!
//! Merges per-source message archives, buckets the merged archive by calendar
//! month into a dense correspondent × medium grid, and loads normalized
//! archive files through the [`connector::Connector`] seam.

pub mod analyzer;
pub mod connector;
pub mod merger;
pub mod reader;

pub use msgviz_core as core;
