use clap::Parser;
use std::path::{Path, PathBuf};

use crate::time_utils;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Month-by-month correspondence analytics over merged message archives
#[derive(Parser, Debug, Clone)]
#[command(
    name = "msgviz",
    about = "Month-by-month correspondence analytics over merged message archives",
    version
)]
pub struct Settings {
    /// Archive files (.jsonl) or directories to scan; defaults to ~/.msgviz/archives
    pub inputs: Vec<PathBuf>,

    /// Timezone in which calendar months are cut ("auto" for the system zone)
    #[arg(long, default_value = "UTC", env = "MSGVIZ_TIMEZONE", value_parser = parse_timezone_arg)]
    pub timezone: String,

    /// Write the report here instead of stdout
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Pretty-print the JSON report
    #[arg(long)]
    pub pretty: bool,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl Settings {
    /// Parse the process arguments and apply `--debug`.
    pub fn load() -> Self {
        Self::resolve(Self::parse())
    }

    /// Same as [`load`](Self::load) but from an explicit argument list.
    pub fn load_from_args<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::resolve(Self::parse_from(args))
    }

    fn resolve(mut settings: Settings) -> Settings {
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }

    /// The paths to scan: explicit inputs, or `default_dir` when none were
    /// given.
    pub fn input_paths(&self, default_dir: Option<&Path>) -> Vec<PathBuf> {
        if !self.inputs.is_empty() {
            return self.inputs.clone();
        }
        default_dir.map(|d| vec![d.to_path_buf()]).unwrap_or_default()
    }
}

/// Accept `"auto"` or a recognised IANA timezone name.
fn parse_timezone_arg(value: &str) -> Result<String, String> {
    if value.eq_ignore_ascii_case("auto") || time_utils::validate_timezone(value) {
        Ok(value.to_string())
    } else {
        Err(format!("unknown timezone \"{}\"", value))
    }
}

/// Default archive directory: `~/.msgviz/archives`.
pub fn default_archive_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".msgviz").join("archives"))
}

// ── Tests ──────────────────────────────────────────────────────────────────────
