#![allow(clippy::module_name_repetitions)]
//! Default file locations for matcher inputs and outputs.
//!
//! All paths are relative to the project root's `data/` directory. Any
//! of them can be overridden through [`MatchConfig`] or CLI flags.

use std::path::{Path, PathBuf};

use segment_match_matcher_models::MatchConfig;

/// Returns the workspace root directory.
///
/// Resolved at compile time from `CARGO_MANIFEST_DIR`. Falls back to the
/// manifest directory itself if it is not nested two levels deep.
#[must_use]
pub fn project_root() -> PathBuf {
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest
        .ancestors()
        .nth(2)
        .unwrap_or(manifest)
        .to_path_buf()
}

/// Returns the `data/` directory path.
#[must_use]
pub fn data_dir() -> PathBuf {
    project_root().join("data")
}

/// Returns the `data/input/` directory holding source tables.
#[must_use]
pub fn input_dir() -> PathBuf {
    data_dir().join("input")
}

/// Returns the `data/output/` directory for match results.
#[must_use]
pub fn output_dir() -> PathBuf {
    data_dir().join("output")
}

/// Ensures the parent directory of `path` exists.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be created.
pub fn ensure_parent(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Every file a run touches, with config overrides applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPaths {
    /// Citation CSV.
    pub citations: PathBuf,
    /// Road-network CSV.
    pub roads: PathBuf,
    /// Suffix synonym TSV.
    pub suffixes: PathBuf,
    /// `citation_id,segment_id` output.
    pub assignments: PathBuf,
    /// `citation_id,decision` audit output.
    pub audit: PathBuf,
    /// Grouped-citation JSON checkpoint.
    pub checkpoint: PathBuf,
}

impl RunPaths {
    /// Resolves paths from `config`, defaulting unset ones under `data/`.
    #[must_use]
    pub fn from_config(config: &MatchConfig) -> Self {
        let or = |path: &Option<PathBuf>, default: PathBuf| path.clone().unwrap_or(default);

        Self {
            citations: or(&config.citations_path, input_dir().join("citations.csv")),
            roads: or(&config.roads_path, input_dir().join("centerline.csv")),
            suffixes: or(&config.suffixes_path, input_dir().join("suffixes.txt")),
            assignments: or(
                &config.assignments_path,
                output_dir().join("citation_segments.csv"),
            ),
            audit: or(&config.audit_path, output_dir().join("match_audit.csv")),
            checkpoint: or(
                &config.checkpoint_path,
                output_dir().join("citation_groups.json"),
            ),
        }
    }
}
