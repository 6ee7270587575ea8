//! Workbook filename parsing.
//!
//! Source workbooks are named `{KNR}_{Kommune}_Properties.xlsx` or
//! `{KNR}_{Kommune}_Properties_Imputed.xlsx`. The municipality part may carry
//! `_` for spaces, several names joined by `___`, or an appended county name
//! (`4613_Herøy_Møre_og_Romsdal_Properties.xlsx`).

use std::sync::LazyLock;

use matrikkel_shared::DataSource;
use regex::Regex;

// ---------------------------------------------------------------------------
// Regex patterns (compiled once)
// ---------------------------------------------------------------------------

/// Matches a source workbook filename and captures the stem before the suffix.
static WORKBOOK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+)_Properties(_Imputed)?\.xlsx$").expect("workbook filename regex")
});

// ---------------------------------------------------------------------------
// Filename classification
// ---------------------------------------------------------------------------

/// True for `*_Properties.xlsx` / `*_Properties_Imputed.xlsx`, excluding
/// Office lock files (`~$...`).
pub fn is_workbook_name(file_name: &str) -> bool {
    !file_name.starts_with("~$") && WORKBOOK_RE.is_match(file_name)
}

/// Source tree a workbook stem belongs to, from its `_Properties_Imputed` suffix.
pub fn source_for_stem(stem: &str) -> DataSource {
    if stem.to_lowercase().ends_with("_properties_imputed") {
        DataSource::Imputed
    } else {
        DataSource::Raw
    }
}

// ---------------------------------------------------------------------------
// Name normalization and candidates
// ---------------------------------------------------------------------------

/// Normalize a municipality name for filename matching: `_` becomes a space,
/// whitespace collapses, and the result is lower-cased.
pub fn normalize_kommune_name(value: &str) -> String {
    value
        .replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// The municipality part of a stem: everything after the `{KNR}_` prefix with
/// the `_Properties[_Imputed]` suffix removed. Empty when the stem has no prefix.
fn name_part(stem: &str) -> String {
    let mut parts: Vec<&str> = stem.split('_').collect();
    if parts.len() < 2 {
        return String::new();
    }

    let n = parts.len();
    if n >= 2
        && parts[n - 1].eq_ignore_ascii_case("imputed")
        && parts[n - 2].eq_ignore_ascii_case("properties")
    {
        parts.truncate(n - 2);
    } else if parts[n - 1].eq_ignore_ascii_case("properties") {
        parts.truncate(n - 1);
    }

    if parts.len() > 1 {
        parts[1..].join("_")
    } else {
        String::new()
    }
}

/// All normalized names a stem can be addressed by, in priority order and
/// without duplicates: each `___`-separated name, the whole name part, and
/// the first `_` segment (for stems that append a county name).
pub fn extract_candidates(stem: &str) -> Vec<String> {
    if !stem.contains('_') {
        return vec![normalize_kommune_name(stem)];
    }
    candidates_with(stem, normalize_kommune_name)
}

/// The same candidates as [`extract_candidates`] with `_` turned into spaces
/// but casing kept, for use as display and ownership names. Empty when the
/// stem has no municipality part.
pub fn extract_display_candidates(stem: &str) -> Vec<String> {
    candidates_with(stem, display_name)
}

fn display_name(value: &str) -> String {
    value.replace('_', " ").split_whitespace().collect::<Vec<_>>().join(" ")
}

fn candidates_with(stem: &str, render: fn(&str) -> String) -> Vec<String> {
    let name = name_part(stem);
    let mut candidates: Vec<String> = Vec::new();
    let mut seen: Vec<String> = Vec::new();
    let mut push = |candidate: String| {
        let key = normalize_kommune_name(&candidate);
        if !key.is_empty() && !seen.contains(&key) {
            seen.push(key);
            candidates.push(candidate);
        }
    };

    for piece in name.split("___").filter(|p| !p.is_empty()) {
        push(render(piece));
    }
    push(render(&name));
    push(render(name.split('_').next().unwrap_or_default()));

    candidates
}

/// Display name for a stem, used when a batch build has no user-supplied name:
/// the first `___` piece with `_` turned into spaces, original casing kept.
/// `None` when the stem has no municipality part.
pub fn extract_kommune_name(stem: &str) -> Option<String> {
    extract_display_candidates(stem).into_iter().next()
}
