//! Ownership eligibility: keep only records the municipality owns outright.
//!
//! A record qualifies when the target municipality appears among its owners
//! with role code 0, holds at least 100% across its own entries, and the
//! combined share of all owners does not exceed 100% whenever someone else
//! is also listed. Surpluses on the municipality's own entries are tolerated.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::{debug, info, warn};

use matrikkel_codes::QUALIFYING_OWNER_ROLE;
use matrikkel_shared::columns::{ALLE_EIERANDELER, ALLE_EIERE, ALLE_EIERFORHOLD_KODE_IDS};
use matrikkel_shared::{PropertyRecord, RecordSet, is_missing_token, value_to_string};

/// Absolute tolerance for share comparisons against 100%.
const SHARE_TOLERANCE: f64 = 1e-6;

static SEPARATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[;,]").expect("ownership separator regex"));

static CODE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("role code regex"));

static SHARE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?\d+(?:\.\d+)?").expect("share regex"));

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One owner position from the aligned owner / role / share arrays.
#[derive(Debug, Clone, PartialEq)]
pub struct OwnershipEntry {
    /// Normalized owner name (lower-case, single spaces).
    pub owner: String,
    pub role_codes: BTreeSet<i64>,
    /// `None` when the share text holds no number.
    pub share: Option<f64>,
}

/// Eligibility predicate for one target municipality.
#[derive(Debug, Clone)]
pub struct OwnershipFilter {
    target: String,
}

impl OwnershipFilter {
    /// `"Bergen"` and `"BERGEN  kommune"` both target `"bergen kommune"`.
    pub fn new(kommune: &str) -> Self {
        let base = normalize_owner_name(kommune);
        let target = if base.ends_with(" kommune") || base == "kommune" {
            base
        } else {
            format!("{base} kommune")
        };
        Self { target }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Aligned ownership entries, or `None` when any array is empty or the
    /// three differ in length.
    pub fn entries(record: &PropertyRecord) -> Option<Vec<OwnershipEntry>> {
        let owners = split_values(record.get(ALLE_EIERE));
        let codes = split_values(record.get(ALLE_EIERFORHOLD_KODE_IDS));
        let shares = split_values(record.get(ALLE_EIERANDELER));

        if owners.is_empty() || codes.is_empty() || shares.is_empty() {
            return None;
        }
        if owners.len() != codes.len() || owners.len() != shares.len() {
            return None;
        }

        let entries = owners
            .iter()
            .zip(&codes)
            .zip(&shares)
            .map(|((owner, code), share)| OwnershipEntry {
                owner: normalize_owner_name(owner),
                role_codes: parse_role_codes(code),
                share: parse_share(share),
            })
            .collect();
        Some(entries)
    }

    /// True when the target appears among the record's owners in any role
    /// and with any share.
    pub fn lists_target(&self, record: &PropertyRecord) -> bool {
        split_values(record.get(ALLE_EIERE))
            .iter()
            .any(|owner| normalize_owner_name(owner) == self.target)
    }

    pub fn is_eligible(&self, record: &PropertyRecord) -> bool {
        let Some(entries) = Self::entries(record) else {
            return false;
        };

        let (own, others): (Vec<&OwnershipEntry>, Vec<&OwnershipEntry>) =
            entries.iter().partition(|e| e.owner == self.target);
        if own.is_empty() {
            return false;
        }

        if !own
            .iter()
            .any(|e| e.role_codes.contains(&QUALIFYING_OWNER_ROLE))
        {
            return false;
        }

        let own_share: f64 = own.iter().filter_map(|e| e.share).sum();
        if own_share < 100.0 - SHARE_TOLERANCE {
            return false;
        }

        // Every share must parse before the total is trusted.
        let Some(total) = entries.iter().map(|e| e.share).sum::<Option<f64>>() else {
            return false;
        };

        others.is_empty() || total <= 100.0 + SHARE_TOLERANCE
    }
}

// ---------------------------------------------------------------------------
// Record-set filter
// ---------------------------------------------------------------------------

/// Keep the records `kommune` owns outright. Without the three ownership
/// columns nothing can qualify, so the result is empty.
pub fn filter_owned_records(mut set: RecordSet, kommune: &str) -> RecordSet {
    let missing: Vec<&str> = [ALLE_EIERE, ALLE_EIERFORHOLD_KODE_IDS, ALLE_EIERANDELER]
        .into_iter()
        .filter(|c| !set.has_column(c))
        .collect();
    if !missing.is_empty() {
        warn!(
            missing = %missing.join(", "),
            "ownership filter skipped: required columns absent, returning no rows"
        );
        return set.empty_like();
    }

    if kommune.trim().is_empty() {
        warn!("ownership filter skipped: no municipality name, returning no rows");
        return set.empty_like();
    }

    let filter = OwnershipFilter::new(kommune);
    let removed = set.retain(|r| filter.is_eligible(r));
    if removed > 0 {
        info!(removed, target = filter.target(), "filtered out rows failing ownership criteria");
    }
    set
}

/// Pick the candidate name that owners in `set` actually use: the one listed
/// on the most records, earliest on ties. `None` when no candidate is listed
/// anywhere or the owner column is absent.
pub fn resolve_owner_name<'a>(set: &RecordSet, candidates: &'a [String]) -> Option<&'a str> {
    if !set.has_column(ALLE_EIERE) {
        return None;
    }

    let mut best: Option<(&'a str, usize)> = None;
    for candidate in candidates.iter().filter(|c| !c.trim().is_empty()) {
        let filter = OwnershipFilter::new(candidate);
        let listed = set.records.iter().filter(|r| filter.lists_target(r)).count();
        if listed > best.map_or(0, |(_, n)| n) {
            best = Some((candidate.as_str(), listed));
        }
    }

    if let Some((name, listed)) = best {
        debug!(name, listed, "resolved owner name from candidates");
    }
    best.map(|(name, _)| name)
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

fn normalize_owner_name(value: &str) -> String {
    value
        .replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Split an aggregate cell on `;` / `,`, dropping blank parts.
fn split_values(value: Option<&Value>) -> Vec<String> {
    let Some(value) = value.filter(|v| !is_missing_token(v)) else {
        return Vec::new();
    };
    SEPARATOR_RE
        .split(value_to_string(value).trim())
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_role_codes(raw: &str) -> BTreeSet<i64> {
    CODE_RE
        .find_iter(raw)
        .filter_map(|m| m.as_str().parse().ok())
        .collect()
}

/// First number in a share such as `"100.0%"`.
fn parse_share(raw: &str) -> Option<f64> {
    if is_missing_token(&Value::from(raw)) {
        return None;
    }
    SHARE_RE.find(raw).and_then(|m| m.as_str().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(owners: &str, codes: &str, shares: &str) -> PropertyRecord {
        let mut r = PropertyRecord::new();
        r.set(ALLE_EIERE, owners);
        r.set(ALLE_EIERFORHOLD_KODE_IDS, codes);
        r.set(ALLE_EIERANDELER, shares);
        r
    }

    fn bergen() -> OwnershipFilter {
        OwnershipFilter::new("Bergen")
    }

    #[test]
    fn target_gets_kommune_suffix() {
        assert_eq!(OwnershipFilter::new("  Nord_Aurdal ").target(), "nord aurdal kommune");
        assert_eq!(OwnershipFilter::new("BERGEN KOMMUNE").target(), "bergen kommune");
    }

    #[test]
    fn full_owner_with_zero_share_other_is_kept() {
        let r = record("Bergen kommune; Statsbygg", "0; 1", "100.0%; 0.0%");
        assert!(bergen().is_eligible(&r));
    }

    #[test]
    fn share_just_below_full_is_excluded() {
        let r = record("Bergen kommune", "0", "99.99%");
        assert!(!bergen().is_eligible(&r));
    }

    #[test]
    fn split_shares_add_up() {
        let r = record("Bergen kommune; Bergen kommune", "0; 1", "60; 40");
        assert!(bergen().is_eligible(&r));
    }

    #[test]
    fn requires_qualifying_role() {
        let r = record("Bergen kommune", "1 11", "100");
        assert!(!bergen().is_eligible(&r));
    }

    #[test]
    fn absent_target_is_excluded() {
        let r = record("Vestland fylkeskommune", "0", "100");
        assert!(!bergen().is_eligible(&r));
    }

    #[test]
    fn misaligned_arrays_are_excluded() {
        let r = record("Bergen kommune; Statsbygg", "0", "100; 0");
        assert!(!bergen().is_eligible(&r));
        let r = record("Bergen kommune", "", "100");
        assert!(!bergen().is_eligible(&r));
    }

    #[test]
    fn unparsable_other_share_is_excluded() {
        let r = record("Bergen kommune; Statsbygg", "0; 1", "100; ukjent");
        assert!(!bergen().is_eligible(&r));
    }

    #[test]
    fn surplus_only_rejected_with_other_owners() {
        let solo = record("Bergen kommune; Bergen kommune", "0; 0", "100; 0.3");
        assert!(bergen().is_eligible(&solo));

        let shared = record("Bergen kommune; Statsbygg", "0; 1", "100.3; 0");
        assert!(!bergen().is_eligible(&shared));

        let over = record("Bergen kommune; Statsbygg", "0; 1", "100; 5");
        assert!(!bergen().is_eligible(&over));
    }

    #[test]
    fn commas_also_separate() {
        let r = record("Bergen kommune, Statsbygg", "0, 1", "100, 0");
        assert!(bergen().is_eligible(&r));
    }

    #[test]
    fn entries_are_parsed_by_index() {
        let r = record("Bergen  Kommune; Statsbygg", "0 1; 11", "75.5%; 24.5%");
        let entries = OwnershipFilter::entries(&r).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].owner, "bergen kommune");
        assert_eq!(entries[0].role_codes, BTreeSet::from([0, 1]));
        assert_eq!(entries[1].share, Some(24.5));
    }

    #[test]
    fn owner_name_picks_listed_candidate() {
        let set = RecordSet::new(
            vec![
                ALLE_EIERE.to_string(),
                ALLE_EIERFORHOLD_KODE_IDS.to_string(),
                ALLE_EIERANDELER.to_string(),
            ],
            vec![
                record("Herøy kommune", "0", "100"),
                record("Herøy kommune; Privat Person", "0; 1", "50; 50"),
                record("Privat Person", "0", "100"),
            ],
        );
        let candidates = vec!["Herøy Møre og Romsdal".to_string(), "Herøy".to_string()];
        let name = resolve_owner_name(&set, &candidates);
        assert_eq!(name, Some("Herøy"));

        let kept = filter_owned_records(set, name.unwrap());
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn owner_name_unresolved_without_listing() {
        let set = RecordSet::new(
            vec![ALLE_EIERE.to_string()],
            vec![record("Privat Person", "0", "100")],
        );
        assert_eq!(resolve_owner_name(&set, &["Bergen".to_string()]), None);

        let no_owner_column = RecordSet::new(vec![], vec![PropertyRecord::new()]);
        assert_eq!(resolve_owner_name(&no_owner_column, &["Bergen".to_string()]), None);
    }

    #[test]
    fn missing_columns_yield_empty_set() {
        let mut r = PropertyRecord::new();
        r.set(ALLE_EIERE, "Bergen kommune");
        let set = RecordSet::new(vec![ALLE_EIERE.into()], vec![r]);
        let filtered = filter_owned_records(set, "Bergen");
        assert!(filtered.is_empty());
        assert_eq!(filtered.columns, vec![ALLE_EIERE]);
    }

    #[test]
    fn filters_record_set() {
        let columns = vec![
            ALLE_EIERE.to_string(),
            ALLE_EIERFORHOLD_KODE_IDS.to_string(),
            ALLE_EIERANDELER.to_string(),
        ];
        let set = RecordSet::new(
            columns,
            vec![
                record("Bergen kommune", "0", "100"),
                record("Privat Person", "0", "100"),
                record("Bergen kommune", "0", "50"),
            ],
        );
        let filtered = filter_owned_records(set, "Bergen");
        assert_eq!(filtered.len(), 1);
    }
}
