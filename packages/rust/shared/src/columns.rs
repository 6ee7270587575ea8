//! Column names of the `BuildingOwnership` sheet and the columns the
//! pipeline derives from it. Single source of truth for every stage.

// Property identification
pub const KOMMUNE_NR: &str = "Kommunenummer";
pub const GARDS_NR: &str = "Gardsnummer";
pub const BRUKS_NR: &str = "Bruksnummer";
/// Derived: `{KNR}-{GNR}-{BNR}`.
pub const KNR_GNR_BNR: &str = "Knr-Gnr-Bnr";

// Building type hierarchy
/// Source-system internal building-type id.
pub const BYGNINGSTYPE_KODE_ID: &str = "BygningstypeKodeId";
/// Official classification code (NS 3457 / SSB).
pub const BYGNINGSTYPE_KODE_SSB: &str = "BygningstypeKodeSSB";
pub const HOVEDGRUPPE: &str = "Hovedgruppe";
pub const BYGNINGSGRUPPE: &str = "Bygningsgruppe";
pub const BYGNINGSTYPE: &str = "Bygningstype";
pub const FORENKLET_BYGNINGS_KATEGORI: &str = "Forenklet Bygningskategori";

// Building status
pub const BYGNINGSSTATUS_KODE_ID: &str = "BygningsstatusKodeId";
pub const TIDLIGSTE_STATUS_DATO: &str = "TidligsteStatusDato";
pub const TEK_STANDARD: &str = "TEK-standard";
pub const TEK_IKRAFTTREDELSE: &str = "TEK Ikrafttredelse";
pub const TEK_PERIODE: &str = "TEK Periode";

// Address
pub const ADRESSENAVN: &str = "Adressenavn";
pub const NUMMER: &str = "Nummer";
pub const POSTNUMMER: &str = "Postnummer";
pub const POSTSTED: &str = "Poststed";
/// Semicolon-joined alternate addresses.
pub const ALT_ADRESSER: &str = "Alt. Adresser";
/// Boolean: alternate addresses were copied from cadastral-key siblings.
pub const ALT_ADRESSER_FRA_KNR_GNR_BNR: &str = "Alt. Adresser fra Knr-Gnr-Bnr";
/// Derived: `{Adressenavn} {Nummer}`.
pub const ADRESSE: &str = "Adresse";
pub const GOOGLE_MAPS_LINK: &str = "GoogleMapsLink";

// Ownership aggregates (index-aligned, `;`/`,` separated)
pub const ALLE_EIERE: &str = "AlleEiere";
pub const ALLE_EIERFORHOLD_KODE_IDS: &str = "AlleEierforholdKodeIds";
pub const ALLE_EIERANDELER: &str = "AlleEierandeler";

// Sub-units (business tenants)
pub const UNDERENHETER: &str = "Underenheter";
pub const ANTALL_UNDERENHETER: &str = "Antall Underenheter";
pub const PARSED_UNDERENHETER: &str = "_parsedUnderenheter";

// Duplicate detection
pub const DUPLIKAT_FLAGG: &str = "DuplikatFlagg";
pub const DUPLIKAT_GRUPPE: &str = "DuplikatGruppe";
