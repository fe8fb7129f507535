//! Core types for msgviz.
//!
//! Defines the message and archive entity model, calendar-month keys, the
//! pluggable formality scorer, timestamp helpers, CLI settings and the shared
//! error type.

pub mod error;
pub mod formality;
pub mod models;
pub mod settings;
pub mod time_utils;

pub use error::{ArchiveError, Result};
pub use models::{Message, MessageArchive, MonthKey};
