//! Source workbook discovery.
//!
//! Finds the `BuildingOwnership` workbook for a municipality in a source
//! directory by matching the requested name against every name candidate
//! its filename yields. A missing directory or an unmatched name is
//! [`LocateResult::NotFound`], never an error.

mod parser;

use std::path::{Path, PathBuf};

use matrikkel_shared::{DataSource, MatrikkelError, Result};
use tracing::{debug, info, instrument, warn};

pub use parser::{
    extract_candidates, extract_display_candidates, extract_kommune_name, is_workbook_name,
    normalize_kommune_name, source_for_stem,
};

// ---------------------------------------------------------------------------
// LocateResult
// ---------------------------------------------------------------------------

/// Outcome of looking up a municipality's workbook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocateResult {
    /// A workbook matched; when several match, the first in sorted order.
    Found {
        path: PathBuf,
        /// Source tree implied by the filename suffix.
        source: DataSource,
    },
    /// No workbook for this municipality (or no such directory).
    NotFound,
}

/// A workbook found by [`scan`], with the names a batch build may use for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkbookFile {
    pub path: PathBuf,
    /// Display name: the first of `candidates`.
    pub kommune: String,
    /// Every name the filename yields, in priority order. A county-suffixed
    /// stem lists the bare municipality last.
    pub candidates: Vec<String>,
    pub source: DataSource,
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Find the workbook for `kommune` in `dir`.
#[instrument(skip_all, fields(kommune = %kommune, dir = %dir.display()))]
pub fn locate(kommune: &str, dir: &Path) -> Result<LocateResult> {
    let target = normalize_kommune_name(kommune);
    if target.is_empty() || !dir.is_dir() {
        debug!("empty name or missing directory");
        return Ok(LocateResult::NotFound);
    }

    let matches: Vec<PathBuf> = workbook_paths(dir)?
        .into_iter()
        .filter(|path| extract_candidates(&file_stem(path)).contains(&target))
        .collect();

    let Some(first) = matches.first() else {
        debug!("no workbook matched");
        return Ok(LocateResult::NotFound);
    };

    if matches.len() > 1 {
        let names: Vec<String> = matches.iter().map(|p| file_name(p)).collect();
        warn!(
            matches = %names.join(", "),
            "multiple workbooks matched, using first"
        );
    }

    let source = source_for_stem(&file_stem(first));
    info!(path = %first.display(), %source, "located workbook");
    Ok(LocateResult::Found {
        path: first.clone(),
        source,
    })
}

/// List every workbook in `dir` in sorted order, each with its display name.
/// Files whose stem has no municipality part are skipped.
pub fn scan(dir: &Path) -> Result<Vec<WorkbookFile>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let files: Vec<WorkbookFile> = workbook_paths(dir)?
        .into_iter()
        .filter_map(|path| {
            let stem = file_stem(&path);
            let candidates = extract_display_candidates(&stem);
            let Some(kommune) = candidates.first().cloned() else {
                debug!(file = %path.display(), "skipping workbook without municipality name");
                return None;
            };
            Some(WorkbookFile {
                source: source_for_stem(&stem),
                kommune,
                candidates,
                path,
            })
        })
        .collect();

    info!(dir = %dir.display(), count = files.len(), "scanned workbooks");
    Ok(files)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Sorted workbook paths directly inside `dir`.
fn workbook_paths(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| MatrikkelError::io(dir, e))?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| MatrikkelError::io(dir, e))?;
        let path = entry.path();
        if path.is_file() && is_workbook_name(&file_name(&path)) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
