//! Building-regulation (TEK) period annotation from the earliest status date.

use chrono::NaiveDate;
use serde_json::Value;

use matrikkel_shared::columns::{
    TEK_IKRAFTTREDELSE, TEK_PERIODE, TEK_STANDARD, TIDLIGSTE_STATUS_DATO,
};
use matrikkel_shared::{RecordSet, is_missing_token, value_to_string};

/// Standard name, in-force label and period label. All empty when unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TekInfo {
    pub standard: String,
    pub in_force: String,
    pub period: String,
}

/// Maps a date-like cell to the regulation in force at that date.
pub trait TekResolver: Send + Sync {
    fn resolve(&self, status_date: &Value) -> TekInfo;
}

struct TekStandard {
    name: &'static str,
    in_force: (i32, u32, u32),
    in_force_label: &'static str,
    period: &'static str,
}

/// Newest first; the first standard in force on or before a date applies.
const STANDARDS: &[TekStandard] = &[
    TekStandard {
        name: "TEK17",
        in_force: (2017, 7, 1),
        in_force_label: "1. jul 2017",
        period: "2017–i dag",
    },
    TekStandard {
        name: "TEK10",
        in_force: (2010, 7, 1),
        in_force_label: "1. jul 2010",
        period: "2010–2017",
    },
    TekStandard {
        name: "TEK07",
        in_force: (2007, 2, 1),
        in_force_label: "1. feb 2007",
        period: "2007–2010",
    },
    TekStandard {
        name: "TEK97",
        in_force: (1997, 7, 1),
        in_force_label: "1. jul 1997",
        period: "1997–2007",
    },
    TekStandard {
        name: "BF87",
        in_force: (1987, 7, 1),
        in_force_label: "1. jul 1987",
        period: "1987–1997",
    },
    TekStandard {
        name: "BF85",
        in_force: (1985, 1, 1),
        in_force_label: "1. jan 1985",
        period: "1985–1987",
    },
    TekStandard {
        name: "BF69",
        in_force: (1969, 8, 1),
        in_force_label: "1. aug 1969",
        period: "1969–1985",
    },
    TekStandard {
        name: "BF49",
        in_force: (1949, 12, 15),
        in_force_label: "15. des 1949",
        period: "1949–1969",
    },
];

const PRE_1949: TekStandard = TekStandard {
    name: "Pre-1949",
    in_force: (1, 1, 1),
    in_force_label: "Før 1949",
    period: "Før 1949",
};

/// The Norwegian regulation table from BF49 through TEK17.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardTek;

impl StandardTek {
    /// Parse the first 10 chars of the cell as `YYYY-MM-DD`.
    fn parse_date(value: &Value) -> Option<NaiveDate> {
        if is_missing_token(value) {
            return None;
        }
        let text = value_to_string(value);
        let head = text.trim().get(..10)?;
        NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
    }
}

impl TekResolver for StandardTek {
    fn resolve(&self, status_date: &Value) -> TekInfo {
        let Some(date) = Self::parse_date(status_date) else {
            return TekInfo::default();
        };

        let standard = STANDARDS
            .iter()
            .find(|s| {
                let (y, m, d) = s.in_force;
                NaiveDate::from_ymd_opt(y, m, d).is_some_and(|in_force| date >= in_force)
            })
            .unwrap_or(&PRE_1949);

        TekInfo {
            standard: standard.name.to_string(),
            in_force: standard.in_force_label.to_string(),
            period: standard.period.to_string(),
        }
    }
}

/// Add `TEK-standard`, `TEK Ikrafttredelse` and `TEK Periode` from
/// `TidligsteStatusDato`. No-op when the date column is absent.
pub fn annotate_tek(set: &mut RecordSet, resolver: &dyn TekResolver) {
    if !set.has_column(TIDLIGSTE_STATUS_DATO) {
        return;
    }
    for column in [TEK_STANDARD, TEK_IKRAFTTREDELSE, TEK_PERIODE] {
        set.ensure_column(column);
    }
    for record in &mut set.records {
        let info = resolver.resolve(record.get(TIDLIGSTE_STATUS_DATO).unwrap_or(&Value::Null));
        record.set(TEK_STANDARD, info.standard);
        record.set(TEK_IKRAFTTREDELSE, info.in_force);
        record.set(TEK_PERIODE, info.period);
    }
}
