//! Duplicate-group reconciliation.
//!
//! Records sharing a `DuplikatGruppe` describe the same property. Their
//! sub-unit (tenant) lists are merged by name, rows flagged as duplicates
//! are dropped, and the surviving rows carry the merged list.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use matrikkel_shared::columns::{
    ADRESSE, ANTALL_UNDERENHETER, DUPLIKAT_FLAGG, DUPLIKAT_GRUPPE, PARSED_UNDERENHETER,
    UNDERENHETER,
};
use matrikkel_shared::{PropertyRecord, RecordSet, is_missing_token, value_to_string};

/// `Name AS [Industry, 123]` or `Name AS [Industry, 12.3]`.
static SUB_UNIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+?)\s*\[(.+),\s*(\d+(?:\.\d+)?)\]$").expect("sub-unit regex")
});

/// Flag text marking a redundant row, matched case-insensitively.
const DUPLICATE_MARKER: &str = "duplicate";

/// One business tenant parsed from the sub-unit field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubUnit {
    pub name: String,
    pub industry: String,
    pub code: String,
    /// Address of the record the entry came from.
    pub address: Option<String>,
}

impl SubUnit {
    /// `name [industry, code]`, or the bare name when either is empty.
    pub fn display(&self) -> String {
        if self.industry.is_empty() || self.code.is_empty() {
            self.name.clone()
        } else {
            format!("{} [{}, {}]", self.name, self.industry, self.code)
        }
    }
}

/// Parse a `;`-joined sub-unit field. Tokens that do not match the
/// bracketed form become bare names.
pub fn parse_sub_units(value: Option<&Value>, address: Option<&str>) -> Vec<SubUnit> {
    let Some(value) = value.filter(|v| !is_missing_token(v)) else {
        return Vec::new();
    };

    value_to_string(value)
        .split(';')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| match SUB_UNIT_RE.captures(part) {
            Some(caps) => SubUnit {
                name: caps[1].trim().to_string(),
                industry: caps[2].trim().to_string(),
                code: caps[3].trim().to_string(),
                address: address.map(str::to_string),
            },
            None => SubUnit {
                name: part.to_string(),
                industry: String::new(),
                code: String::new(),
                address: address.map(str::to_string),
            },
        })
        .collect()
}

fn group_key(record: &PropertyRecord) -> Option<String> {
    record.text(DUPLIKAT_GRUPPE)
}

fn is_flagged_duplicate(record: &PropertyRecord) -> bool {
    record
        .text(DUPLIKAT_FLAGG)
        .is_some_and(|flag| flag.to_lowercase().contains(DUPLICATE_MARKER))
}

/// Merged sub-units per group key, first-seen order, unique by name.
fn merge_groups(set: &RecordSet) -> HashMap<String, Vec<SubUnit>> {
    let mut merged: HashMap<String, Vec<SubUnit>> = HashMap::new();
    for record in &set.records {
        let Some(key) = group_key(record) else {
            continue;
        };
        let address = record.text(ADRESSE);
        let units = merged.entry(key).or_default();
        for unit in parse_sub_units(record.get(UNDERENHETER), address.as_deref()) {
            if !units.iter().any(|u| u.name == unit.name) {
                units.push(unit);
            }
        }
    }
    merged
}

/// Deduplicated copy of `set`.
///
/// Rows flagged as duplicates are dropped whether or not they carry a group
/// key. Other rows without a group key pass through untouched; the rest get
/// the group's merged `Underenheter`, `Antall Underenheter` and
/// `_parsedUnderenheter`. Without both the flag and
/// group columns the input is returned as is.
pub fn merge_duplicates(set: &RecordSet) -> RecordSet {
    if !set.has_column(DUPLIKAT_FLAGG) || !set.has_column(DUPLIKAT_GRUPPE) {
        debug!("duplicate columns absent, skipping merge");
        return set.clone();
    }

    let merged = merge_groups(set);
    let mut out = set.empty_like();
    let mut dropped = 0usize;

    for record in &set.records {
        if is_flagged_duplicate(record) {
            dropped += 1;
            continue;
        }
        let Some(key) = group_key(record) else {
            out.records.push(record.clone());
            continue;
        };

        let units = merged.get(&key).map(Vec::as_slice).unwrap_or_default();
        if units.is_empty() {
            out.records.push(record.clone());
            continue;
        }

        let mut updated = record.clone();
        let listing: Vec<String> = units.iter().map(SubUnit::display).collect();
        updated.set(UNDERENHETER, listing.join("; "));
        updated.set(ANTALL_UNDERENHETER, units.len());
        match serde_json::to_value(units) {
            Ok(parsed) => updated.set(PARSED_UNDERENHETER, parsed),
            Err(e) => warn!(error = %e, group = %key, "cannot serialize merged sub-units"),
        }
        out.records.push(updated);
    }

    if out
        .records
        .iter()
        .any(|r| r.get(PARSED_UNDERENHETER).is_some())
    {
        for column in [UNDERENHETER, ANTALL_UNDERENHETER, PARSED_UNDERENHETER] {
            out.ensure_column(column);
        }
    }

    debug!(
        kept = out.len(),
        dropped,
        groups = merged.len(),
        "merged duplicate groups"
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(group: Value, flag: &str, units: &str) -> PropertyRecord {
        let mut r = PropertyRecord::new();
        r.set(DUPLIKAT_GRUPPE, group);
        r.set(DUPLIKAT_FLAGG, flag);
        r.set(UNDERENHETER, units);
        r
    }

    fn set_of(records: Vec<PropertyRecord>) -> RecordSet {
        RecordSet::new(
            vec![DUPLIKAT_GRUPPE.into(), DUPLIKAT_FLAGG.into(), UNDERENHETER.into()],
            records,
        )
    }

    #[test]
    fn parses_bracketed_and_bare_entries() {
        let units = parse_sub_units(
            Some(&json!("Acme AS [Retail, 123]; Kiosken;  Beta AS [Services, 45.6] ")),
            Some("Torget 1"),
        );
        assert_eq!(units.len(), 3);
        assert_eq!(units[0].name, "Acme AS");
        assert_eq!(units[0].industry, "Retail");
        assert_eq!(units[0].code, "123");
        assert_eq!(units[0].address.as_deref(), Some("Torget 1"));
        assert_eq!(units[1].name, "Kiosken");
        assert!(units[1].industry.is_empty());
        assert_eq!(units[2].code, "45.6");

        assert!(parse_sub_units(Some(&json!("-")), None).is_empty());
        assert!(parse_sub_units(None, None).is_empty());
    }

    #[test]
    fn duplicate_group_collapses_to_primary() {
        let set = set_of(vec![
            row(json!("G1"), "Primary", "Acme AS [Retail, 123]"),
            row(
                json!("G1"),
                "Duplicate",
                "Acme AS [Retail, 123]; Beta AS [Services, 456]",
            ),
        ]);
        let out = merge_duplicates(&set);

        assert_eq!(out.len(), 1);
        let survivor = &out.records[0];
        assert_eq!(survivor.raw_text(DUPLIKAT_FLAGG), "Primary");
        assert_eq!(survivor.int(ANTALL_UNDERENHETER), Some(2));
        assert_eq!(
            survivor.raw_text(UNDERENHETER),
            "Acme AS [Retail, 123]; Beta AS [Services, 456]"
        );

        let parsed: Vec<SubUnit> =
            serde_json::from_value(survivor.get(PARSED_UNDERENHETER).unwrap().clone()).unwrap();
        let names: Vec<&str> = parsed.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["Acme AS", "Beta AS"]);
        assert!(out.has_column(PARSED_UNDERENHETER));
    }

    #[test]
    fn ungrouped_rows_pass_through() {
        let set = set_of(vec![
            row(json!(null), "Unique", "Acme AS"),
            row(json!(""), "Primary", ""),
        ]);
        let out = merge_duplicates(&set);
        assert_eq!(out.len(), 2);
        assert_eq!(out.records, set.records);
    }

    #[test]
    fn flagged_duplicate_without_group_is_dropped() {
        let set = set_of(vec![
            row(json!(null), "Duplicate", "Acme AS"),
            row(json!("-"), "possible DUPLICATE", ""),
            row(json!(null), "Unique", "Beta AS"),
        ]);
        let out = merge_duplicates(&set);
        assert_eq!(out.len(), 1);
        assert_eq!(out.records[0].raw_text(UNDERENHETER), "Beta AS");
    }

    #[test]
    fn group_without_sub_units_keeps_rows_unchanged() {
        let set = set_of(vec![
            row(json!("G2"), "Primary", ""),
            row(json!("G2"), "possible duplicate", ""),
        ]);
        let out = merge_duplicates(&set);
        assert_eq!(out.len(), 1);
        assert_eq!(out.records[0], set.records[0]);
        assert!(!out.has_column(ANTALL_UNDERENHETER));
    }

    #[test]
    fn missing_columns_is_a_no_op() {
        let mut r = PropertyRecord::new();
        r.set(DUPLIKAT_FLAGG, "Duplicate");
        let set = RecordSet::new(vec![DUPLIKAT_FLAGG.into()], vec![r]);
        assert_eq!(merge_duplicates(&set), set);
    }
}
