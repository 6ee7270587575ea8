//! Cadastral keys and address columns.

use std::collections::HashMap;

use tracing::{debug, info};

use matrikkel_shared::columns::{
    ADRESSE, ADRESSENAVN, ALT_ADRESSER, ALT_ADRESSER_FRA_KNR_GNR_BNR, BRUKS_NR, GARDS_NR,
    KNR_GNR_BNR, KOMMUNE_NR, NUMMER, POSTNUMMER, POSTSTED,
};
use matrikkel_shared::{PropertyRecord, RecordSet};

// ---------------------------------------------------------------------------
// Cadastral key
// ---------------------------------------------------------------------------

/// `{knr}-{gnr}-{bnr}` with each part as an integer, or empty when any part
/// is missing or not numeric.
pub fn cadastral_key(record: &PropertyRecord) -> String {
    let part = |column: &str| {
        if record.is_missing(column) {
            None
        } else {
            record.int(column)
        }
    };
    match (part(KOMMUNE_NR), part(GARDS_NR), part(BRUKS_NR)) {
        (Some(knr), Some(gnr), Some(bnr)) => format!("{knr}-{gnr}-{bnr}"),
        _ => String::new(),
    }
}

/// Set `Knr-Gnr-Bnr` on every record.
pub fn add_cadastral_key_column(set: &mut RecordSet) {
    set.ensure_column(KNR_GNR_BNR);
    for record in &mut set.records {
        let key = cadastral_key(record);
        record.set(KNR_GNR_BNR, key);
    }
}

// ---------------------------------------------------------------------------
// Address backfill
// ---------------------------------------------------------------------------

/// One-line address: `"{name} {number}, {postnr} {poststed}"`, with absent
/// parts left out. Empty without a street name.
fn single_line_address(record: &PropertyRecord) -> String {
    let Some(name) = record.text(ADRESSENAVN) else {
        return String::new();
    };

    let mut address = match record.text(NUMMER) {
        Some(number) => format!("{name} {number}").trim().to_string(),
        None => name,
    };
    if let Some(postnummer) = record.text(POSTNUMMER) {
        address = format!("{address}, {postnummer}");
    }
    if let Some(poststed) = record.text(POSTSTED) {
        address = format!("{address} {poststed}");
    }
    address
}

/// Give records without an address the addresses of their cadastral-key
/// siblings, via `Alt. Adresser`, and flag them in
/// `Alt. Adresser fra Knr-Gnr-Bnr`. The flag column is always added.
/// Returns how many records were backfilled.
pub fn backfill_alt_addresses(set: &mut RecordSet) -> usize {
    set.ensure_column(ALT_ADRESSER_FRA_KNR_GNR_BNR);
    for record in &mut set.records {
        record.set(ALT_ADRESSER_FRA_KNR_GNR_BNR, false);
    }

    if !set.has_column(ADRESSENAVN) || !set.has_column(NUMMER) {
        return 0;
    }

    let keys: Vec<String> = if set.has_column(KNR_GNR_BNR) {
        set.records
            .iter()
            .map(|r| r.text(KNR_GNR_BNR).unwrap_or_default())
            .collect()
    } else if [KOMMUNE_NR, GARDS_NR, BRUKS_NR]
        .iter()
        .all(|c| set.has_column(c))
    {
        set.records.iter().map(cadastral_key).collect()
    } else {
        debug!("no cadastral key available, skipping address backfill");
        return 0;
    };

    let addresses: Vec<String> = set.records.iter().map(single_line_address).collect();

    // Addresses per key, first-seen order, no repeats.
    let mut by_key: HashMap<&str, Vec<&str>> = HashMap::new();
    for (key, address) in keys.iter().zip(&addresses) {
        if key.is_empty() || address.is_empty() {
            continue;
        }
        let list = by_key.entry(key.as_str()).or_default();
        if !list.contains(&address.as_str()) {
            list.push(address.as_str());
        }
    }

    let needs_backfill = keys
        .iter()
        .zip(&addresses)
        .any(|(k, a)| !k.is_empty() && a.is_empty());
    if by_key.is_empty() || !needs_backfill {
        return 0;
    }

    if !set.has_column(ALT_ADRESSER) {
        set.ensure_column(ALT_ADRESSER);
        for record in &mut set.records {
            record.set(ALT_ADRESSER, "");
        }
    }

    let mut backfilled = 0;
    for (i, record) in set.records.iter_mut().enumerate() {
        if keys[i].is_empty() || !addresses[i].is_empty() {
            continue;
        }
        let Some(siblings) = by_key.get(keys[i].as_str()) else {
            continue;
        };

        let mut combined: Vec<String> = record
            .text(ALT_ADRESSER)
            .map(|existing| {
                existing
                    .split(';')
                    .map(str::trim)
                    .filter(|a| !a.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        for address in siblings {
            if !combined.iter().any(|a| a == address) {
                combined.push((*address).to_string());
            }
        }

        record.set(ALT_ADRESSER, combined.join(";"));
        record.set(ALT_ADRESSER_FRA_KNR_GNR_BNR, true);
        backfilled += 1;
    }

    if backfilled > 0 {
        info!(backfilled, "filled alternate addresses from cadastral siblings");
    }
    backfilled
}

// ---------------------------------------------------------------------------
// Address column
// ---------------------------------------------------------------------------

/// Set `Adresse` to `"{Adressenavn} {Nummer}"`, the bare name, or empty.
/// No-op unless both source columns exist.
pub fn add_address_column(set: &mut RecordSet) {
    if !set.has_column(ADRESSENAVN) || !set.has_column(NUMMER) {
        return;
    }
    set.ensure_column(ADRESSE);
    for record in &mut set.records {
        let address = match (record.text(ADRESSENAVN), record.text(NUMMER)) {
            (Some(name), Some(number)) => format!("{name} {number}"),
            (Some(name), None) => name,
            _ => String::new(),
        };
        record.set(ADRESSE, address);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn columns() -> Vec<String> {
        [KOMMUNE_NR, GARDS_NR, BRUKS_NR, ADRESSENAVN, NUMMER, POSTNUMMER, POSTSTED]
            .iter()
            .map(|c| c.to_string())
            .collect()
    }

    fn property(knr: Value, gnr: Value, bnr: Value, street: Option<(&str, f64)>) -> PropertyRecord {
        let mut r = PropertyRecord::new();
        r.set(KOMMUNE_NR, knr);
        r.set(GARDS_NR, gnr);
        r.set(BRUKS_NR, bnr);
        match street {
            Some((name, number)) => {
                r.set(ADRESSENAVN, name);
                r.set(NUMMER, number);
                r.set(POSTNUMMER, 5003);
                r.set(POSTSTED, "Bergen");
            }
            None => {
                r.set(ADRESSENAVN, Value::Null);
                r.set(NUMMER, Value::Null);
                r.set(POSTNUMMER, Value::Null);
                r.set(POSTSTED, Value::Null);
            }
        }
        r
    }

    #[test]
    fn key_from_numeric_parts() {
        let r = property(1201.0.into(), "5".into(), 10.into(), None);
        assert_eq!(cadastral_key(&r), "1201-5-10");

        let r = property(1201.into(), Value::Null, 10.into(), None);
        assert_eq!(cadastral_key(&r), "");

        let r = property(1201.into(), "-".into(), 10.into(), None);
        assert_eq!(cadastral_key(&r), "");
    }

    #[test]
    fn siblings_share_their_address() {
        let mut set = RecordSet::new(
            columns(),
            vec![
                property(1201.into(), 5.into(), 10.into(), Some(("Torget", 1.0))),
                property(1201.into(), 5.into(), 10.into(), None),
                property(1201.into(), 5.into(), 10.into(), None),
                property(Value::Null, 5.into(), 10.into(), None),
            ],
        );

        let backfilled = backfill_alt_addresses(&mut set);
        assert_eq!(backfilled, 2);

        for r in &set.records[1..3] {
            assert_eq!(r.text(ALT_ADRESSER).as_deref(), Some("Torget 1, 5003 Bergen"));
            assert_eq!(r.get(ALT_ADRESSER_FRA_KNR_GNR_BNR), Some(&Value::Bool(true)));
        }
        let lone = &set.records[3];
        assert!(lone.text(ALT_ADRESSER).is_none());
        assert_eq!(lone.get(ALT_ADRESSER_FRA_KNR_GNR_BNR), Some(&Value::Bool(false)));

        let owner = &set.records[0];
        assert_eq!(owner.get(ALT_ADRESSER_FRA_KNR_GNR_BNR), Some(&Value::Bool(false)));
    }

    #[test]
    fn existing_alternates_come_first() {
        let mut cols = columns();
        cols.push(ALT_ADRESSER.into());
        let mut target = property(1201.into(), 5.into(), 10.into(), None);
        target.set(ALT_ADRESSER, "Bryggen 2; Torget 1, 5003 Bergen");
        let mut set = RecordSet::new(
            cols,
            vec![
                property(1201.into(), 5.into(), 10.into(), Some(("Torget", 1.0))),
                property(1201.into(), 5.into(), 10.into(), Some(("Torget", 3.0))),
                target,
            ],
        );

        backfill_alt_addresses(&mut set);
        assert_eq!(
            set.records[2].text(ALT_ADRESSER).as_deref(),
            Some("Bryggen 2;Torget 1, 5003 Bergen;Torget 3, 5003 Bergen")
        );
    }

    #[test]
    fn flag_added_even_without_address_columns() {
        let mut r = PropertyRecord::new();
        r.set(KOMMUNE_NR, 1201);
        let mut set = RecordSet::new(vec![KOMMUNE_NR.into()], vec![r]);
        assert_eq!(backfill_alt_addresses(&mut set), 0);
        assert!(set.has_column(ALT_ADRESSER_FRA_KNR_GNR_BNR));
        assert!(!set.has_column(ALT_ADRESSER));
    }

    #[test]
    fn address_column_formats_numbers() {
        let mut set = RecordSet::new(
            columns(),
            vec![
                property(1201.into(), 5.into(), 10.into(), Some(("Torget", 1.0))),
                property(1201.into(), 5.into(), 10.into(), None),
            ],
        );
        set.records[1].set(ADRESSENAVN, "Bryggen");
        add_address_column(&mut set);

        assert_eq!(set.records[0].text(ADRESSE).as_deref(), Some("Torget 1"));
        assert_eq!(set.records[1].text(ADRESSE).as_deref(), Some("Bryggen"));
    }

    #[test]
    fn key_column_is_added() {
        let mut set = RecordSet::new(
            columns(),
            vec![property(4601.into(), 12.into(), 3.into(), None)],
        );
        add_cadastral_key_column(&mut set);
        assert!(set.has_column(KNR_GNR_BNR));
        assert_eq!(set.records[0].text(KNR_GNR_BNR).as_deref(), Some("4601-12-3"));
    }
}
