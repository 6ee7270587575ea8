//! Building-type hierarchy and simplified category columns.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use matrikkel_codes::{CodeResolver, normalize_simplified_category};
use matrikkel_shared::columns::{
    BYGNINGSGRUPPE, BYGNINGSTYPE, BYGNINGSTYPE_KODE_ID, BYGNINGSTYPE_KODE_SSB,
    FORENKLET_BYGNINGS_KATEGORI, HOVEDGRUPPE,
};
use matrikkel_shared::{PropertyRecord, RecordSet};

/// Fills hierarchy names and the simplified category from a shared [`CodeResolver`].
#[derive(Debug, Clone)]
pub struct CategoryAnnotator {
    resolver: Arc<CodeResolver>,
}

impl CategoryAnnotator {
    pub fn new(resolver: Arc<CodeResolver>) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &CodeResolver {
        &self.resolver
    }

    /// Classification code for a record: the explicit code column when it
    /// parses, otherwise the code mapped from the internal id.
    pub fn resolve_code(record: &PropertyRecord) -> Option<u32> {
        explicit_code(record).or_else(|| {
            record
                .int(BYGNINGSTYPE_KODE_ID)
                .and_then(CodeResolver::code_for_internal_id)
        })
    }

    /// Annotate every record. Populated hierarchy and category cells are kept;
    /// the category column is normalized afterwards either way. No-op when
    /// neither code column exists.
    pub fn annotate(&self, set: &mut RecordSet) {
        if !set.has_column(BYGNINGSTYPE_KODE_SSB) && !set.has_column(BYGNINGSTYPE_KODE_ID) {
            debug!("no building-type code columns, skipping category annotation");
            return;
        }

        for column in [
            BYGNINGSTYPE_KODE_SSB,
            HOVEDGRUPPE,
            BYGNINGSGRUPPE,
            BYGNINGSTYPE,
            FORENKLET_BYGNINGS_KATEGORI,
        ] {
            set.ensure_column(column);
        }

        for record in &mut set.records {
            let code = Self::resolve_code(record);
            let category = self.resolver.category_for_code(code);

            if explicit_code(record).is_none() {
                record.set(BYGNINGSTYPE_KODE_SSB, code.map_or(Value::Null, Value::from));
            }

            let levels = [
                (HOVEDGRUPPE, category.hierarchy.main_group),
                (BYGNINGSGRUPPE, category.hierarchy.group),
                (BYGNINGSTYPE, category.hierarchy.type_name),
            ];
            for (column, name) in levels {
                if record.is_missing(column) {
                    record.set(column, name);
                }
            }

            if record.is_missing(FORENKLET_BYGNINGS_KATEGORI) {
                record.set(FORENKLET_BYGNINGS_KATEGORI, category.simplified);
            }
            let normalized = normalize_simplified_category(
                record.get(FORENKLET_BYGNINGS_KATEGORI).unwrap_or(&Value::Null),
            );
            record.set(FORENKLET_BYGNINGS_KATEGORI, normalized);
        }
    }
}

fn explicit_code(record: &PropertyRecord) -> Option<u32> {
    record
        .int(BYGNINGSTYPE_KODE_SSB)
        .and_then(|c| u32::try_from(c).ok())
}
