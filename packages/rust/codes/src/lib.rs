//! Building-type, status and ownership code resolution.
//!
//! [`CodeResolver`] is built once at startup (from the bundled mapping asset
//! or a configured file) and shared read-only, typically behind an `Arc`,
//! by every pipeline run in the process.

mod tables;

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use matrikkel_shared::{MatrikkelError, Result, is_missing_token, value_to_string};

pub use tables::{
    BUILDING_STATUS_CODES, BUILDING_TYPE_CODES, EXCLUDED_BUILDING_STATUS_CODE_IDS,
    INCLUDED_BUILDING_STATUS_CODE_IDS, INTERNAL_ID_TO_CODE, OWNERSHIP_TYPE_CODES,
    QUALIFYING_OWNER_ROLE,
};

/// Simplified category used when a code is absent or unmapped ("Other").
pub const SIMPLIFIED_CATEGORY_FALLBACK: &str = "Annet";

/// The mapping asset shipped with the crate.
const BUNDLED_MAPPING: &str = include_str!("../data/building_category_mapping_simplified.json");

/// On-disk shape of the mapping asset.
#[derive(Debug, Deserialize)]
struct MappingFile {
    #[serde(default)]
    code_to_category: HashMap<String, String>,
}

/// Three-level name hierarchy for a classification code.
/// Levels that do not apply are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hierarchy {
    pub main_group: String,
    pub group: String,
    pub type_name: String,
}

/// Hierarchy plus simplified category, derived per record and never stored on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildingCategory {
    pub hierarchy: Hierarchy,
    pub simplified: String,
}

/// Read-only lookup over the static code tables and the simplified-category mapping.
#[derive(Debug, Clone)]
pub struct CodeResolver {
    simplified: HashMap<String, String>,
}

impl CodeResolver {
    /// Resolver backed by the mapping asset compiled into the binary.
    pub fn bundled() -> Result<Self> {
        Self::from_json_str(BUNDLED_MAPPING)
    }

    /// Resolver backed by a mapping file on disk.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| MatrikkelError::io(path, e))?;
        let resolver = Self::from_json_str(&content)?;
        info!(path = %path.display(), codes = resolver.simplified.len(), "loaded category mapping");
        Ok(resolver)
    }

    /// Parse a mapping document of the form `{"code_to_category": {"613": "Skoler"}}`.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let file: MappingFile = serde_json::from_str(json)
            .map_err(|e| MatrikkelError::parse(format!("invalid category mapping: {e}")))?;
        debug!(codes = file.code_to_category.len(), "parsed category mapping");
        Ok(Self::with_mapping(file.code_to_category))
    }

    pub fn with_mapping(simplified: HashMap<String, String>) -> Self {
        Self { simplified }
    }

    /// Translate an internal building-type id to its classification code.
    pub fn code_for_internal_id(internal_id: i64) -> Option<u32> {
        let id = u32::try_from(internal_id).ok()?;
        INTERNAL_ID_TO_CODE
            .iter()
            .find(|(i, _)| *i == id)
            .map(|(_, code)| *code)
    }

    /// Derive the hierarchy from the decimal digits of `code`:
    /// `671` → (`6`, `67`, `671`), `67` → (`6`, `67`, -), `6` → (`6`, -, -).
    /// Codes of any other length only resolve their own entry as level 1.
    pub fn hierarchy_for_code(code: u32) -> Hierarchy {
        let digits = code.to_string();
        let name = |c: u32| tables::lookup(BUILDING_TYPE_CODES, c).unwrap_or("").to_string();
        let prefix = |n: usize| digits[..n].parse::<u32>().ok();

        match digits.len() {
            3 => Hierarchy {
                main_group: prefix(1).map(name).unwrap_or_default(),
                group: prefix(2).map(name).unwrap_or_default(),
                type_name: name(code),
            },
            2 => Hierarchy {
                main_group: prefix(1).map(name).unwrap_or_default(),
                group: name(code),
                type_name: String::new(),
            },
            1 => Hierarchy {
                main_group: name(code),
                ..Hierarchy::default()
            },
            _ => Hierarchy {
                main_group: name(code),
                ..Hierarchy::default()
            },
        }
    }

    /// Simplified category for a code, falling back to [`SIMPLIFIED_CATEGORY_FALLBACK`].
    pub fn simplified_category(&self, code: Option<u32>) -> String {
        code.and_then(|c| self.simplified.get(&c.to_string()))
            .cloned()
            .unwrap_or_else(|| SIMPLIFIED_CATEGORY_FALLBACK.to_string())
    }

    /// Full category for a code; a missing code yields empty levels and the fallback.
    pub fn category_for_code(&self, code: Option<u32>) -> BuildingCategory {
        BuildingCategory {
            hierarchy: code.map(Self::hierarchy_for_code).unwrap_or_default(),
            simplified: self.simplified_category(code),
        }
    }

    /// Most specific building-type name for an internal id, or empty.
    pub fn building_type_name(internal_id: i64) -> String {
        let Some(code) = Self::code_for_internal_id(internal_id) else {
            return String::new();
        };
        let h = Self::hierarchy_for_code(code);
        [h.type_name, h.group, h.main_group]
            .into_iter()
            .find(|n| !n.is_empty())
            .unwrap_or_default()
    }

    /// Building-status name, or empty for unknown codes.
    pub fn status_name(status_code: i64) -> &'static str {
        u32::try_from(status_code)
            .ok()
            .and_then(|c| tables::lookup(BUILDING_STATUS_CODES, c))
            .unwrap_or("")
    }

    /// Ownership-role name, `Unknown (n)` for unmapped codes.
    pub fn ownership_type_name(role_code: i64) -> String {
        u32::try_from(role_code)
            .ok()
            .and_then(|c| tables::lookup(OWNERSHIP_TYPE_CODES, c))
            .map(str::to_string)
            .unwrap_or_else(|| format!("Unknown ({role_code})"))
    }

    /// Number of codes in the simplified mapping.
    pub fn mapped_codes(&self) -> usize {
        self.simplified.len()
    }
}

/// Collapse placeholder tokens to the fallback category and trim everything else.
pub fn normalize_simplified_category(value: &Value) -> String {
    if is_missing_token(value) {
        return SIMPLIFIED_CATEGORY_FALLBACK.to_string();
    }
    value_to_string(value).trim().to_string()
}
