//! Split records by building status.

use tracing::debug;

use matrikkel_codes::INCLUDED_BUILDING_STATUS_CODE_IDS;
use matrikkel_shared::columns::BYGNINGSSTATUS_KODE_ID;
use matrikkel_shared::{PropertyRecord, RecordSet};

/// True when the status code is numeric, integral, and on the allow-list.
pub fn has_included_status(record: &PropertyRecord) -> bool {
    match record.float(BYGNINGSSTATUS_KODE_ID) {
        Some(code) if code.fract() == 0.0 => {
            INCLUDED_BUILDING_STATUS_CODE_IDS.contains(&(code as i64))
        }
        _ => false,
    }
}

/// `(included, excluded)`. Without a status column every record is included.
pub fn split_by_status(set: RecordSet) -> (RecordSet, RecordSet) {
    if !set.has_column(BYGNINGSSTATUS_KODE_ID) {
        let excluded = set.empty_like();
        return (set, excluded);
    }
    let (included, excluded) = set.partition(has_included_status);
    debug!(
        included = included.len(),
        excluded = excluded.len(),
        "split by building status"
    );
    (included, excluded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn with_status(status: Value) -> PropertyRecord {
        let mut r = PropertyRecord::new();
        r.set(BYGNINGSSTATUS_KODE_ID, status);
        r
    }

    #[test]
    fn splits_on_allow_list() {
        let set = RecordSet::new(
            vec![BYGNINGSSTATUS_KODE_ID.into()],
            vec![
                with_status(json!(3)),
                with_status(json!(9)),
                with_status(json!("4")),
                with_status(json!("ukjent")),
                with_status(json!(null)),
                with_status(json!(3.5)),
                with_status(json!(13.0)),
            ],
        );
        let (included, excluded) = split_by_status(set);
        assert_eq!(included.len(), 3);
        assert_eq!(excluded.len(), 4);
    }

    #[test]
    fn no_status_column_keeps_everything() {
        let set = RecordSet::new(vec!["Poststed".into()], vec![PropertyRecord::new()]);
        let (included, excluded) = split_by_status(set);
        assert_eq!(included.len(), 1);
        assert!(excluded.is_empty());
        assert_eq!(excluded.columns, vec!["Poststed"]);
    }
}
