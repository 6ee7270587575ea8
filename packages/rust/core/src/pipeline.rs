//! End-to-end build: municipality → workbook → cache or enrichment → dataset bundle.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, instrument};

use matrikkel_codes::CodeResolver;
use matrikkel_locator::{LocateResult, WorkbookFile, locate};
use matrikkel_shared::{
    AppConfig, CACHE_VERSION, DataSource, MatrikkelError, RecordSet, Result, RunStatistics,
};
use matrikkel_storage::{CacheEntry, CacheLookup, CachedTable, EnrichmentCache, content_hash};
use matrikkel_workbook::{SheetReader, XlsxReader};

use crate::address::{add_address_column, add_cadastral_key_column, backfill_alt_addresses};
use crate::category::CategoryAnnotator;
use crate::dedup::merge_duplicates;
use crate::maps::add_maps_link_column;
use crate::ownership::{filter_owned_records, resolve_owner_name};
use crate::status::split_by_status;
use crate::tek::{StandardTek, TekResolver, annotate_tek};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Directories and cache version for a [`Pipeline`].
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Holds `*_Properties.xlsx` workbooks.
    pub raw_dir: PathBuf,
    /// Holds `*_Properties_Imputed.xlsx` workbooks.
    pub imputed_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub imputed_cache_dir: PathBuf,
    /// Version stamped on and required of cache entries.
    pub cache_version: String,
}

impl PipelineConfig {
    /// Directory searched for a municipality's workbook.
    pub fn source_dir(&self, source: DataSource) -> &Path {
        match source {
            DataSource::Raw => &self.raw_dir,
            DataSource::Imputed => &self.imputed_dir,
        }
    }
}

impl From<&AppConfig> for PipelineConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            raw_dir: PathBuf::from(&config.paths.raw_dir),
            imputed_dir: PathBuf::from(&config.paths.imputed_dir),
            cache_dir: PathBuf::from(&config.paths.cache_dir),
            imputed_cache_dir: PathBuf::from(&config.paths.imputed_cache_dir),
            cache_version: CACHE_VERSION.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// How the cache took part in a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheOutcome {
    /// Served from a valid entry.
    Hit,
    /// No entry existed; built and stored.
    Miss,
    /// An entry existed but was stale or incompatible; rebuilt and replaced.
    Rebuilt { reason: String },
}

/// Everything one build produces for a municipality.
#[derive(Debug, Clone)]
pub struct DatasetBundle {
    pub kommune: String,
    /// Workbook the data came from.
    pub path: PathBuf,
    pub source: DataSource,
    /// Owned by the municipality with an included building status.
    pub filtered: RecordSet,
    pub filtered_deduplicated: RecordSet,
    /// Every source row, enriched but not filtered.
    pub unfiltered: RecordSet,
    pub unfiltered_deduplicated: RecordSet,
    /// Owned by the municipality but with an excluded building status.
    pub excluded_status: RecordSet,
    pub excluded_status_deduplicated: RecordSet,
    pub statistics: RunStatistics,
    pub cache: CacheOutcome,
    pub cache_path: PathBuf,
}

impl DatasetBundle {
    /// Snapshot of this bundle as a cache entry stamped with `version`.
    pub fn cache_entry(&self, version: &str) -> CacheEntry {
        let mut entry = CacheEntry::new(&self.filtered, self.statistics.clone(), version);
        entry.deduplicated = Some(CachedTable::from_set(&self.filtered_deduplicated));
        entry.unfiltered = Some(CachedTable::from_set(&self.unfiltered));
        entry.unfiltered_deduplicated = Some(CachedTable::from_set(&self.unfiltered_deduplicated));
        entry.excluded_status = Some(CachedTable::from_set(&self.excluded_status));
        entry.excluded_status_deduplicated =
            Some(CachedTable::from_set(&self.excluded_status_deduplicated));
        entry
    }
}

/// The six record sets, before they are attached to a workbook and cache path.
struct Tables {
    filtered: RecordSet,
    filtered_deduplicated: RecordSet,
    unfiltered: RecordSet,
    unfiltered_deduplicated: RecordSet,
    excluded_status: RecordSet,
    excluded_status_deduplicated: RecordSet,
}

impl Tables {
    /// Recompute every count derivable from the tables; keep the rest.
    fn fill_statistics(&self, stats: &mut RunStatistics, hash: &str) {
        if stats.file_hash.is_empty() {
            stats.file_hash = hash.chars().take(8).collect();
        }
        stats.deduplicated_rows = self.filtered_deduplicated.len();
        stats.unfiltered_rows = self.unfiltered.len();
        stats.unfiltered_deduplicated_rows = self.unfiltered_deduplicated.len();
        stats.filtered_out_rows = self.unfiltered.len().saturating_sub(self.filtered.len());
        stats.filtered_out_status_rows = self.excluded_status.len();
        stats.excluded_status_rows = self.excluded_status.len();
        stats.excluded_status_deduplicated_rows = self.excluded_status_deduplicated.len();
    }
}

/// Workbook bytes with their content hash.
struct WorkbookInput {
    path: PathBuf,
    source: DataSource,
    bytes: Vec<u8>,
    hash: String,
}

impl WorkbookInput {
    fn read(path: &Path, source: DataSource) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| MatrikkelError::io(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            source,
            hash: content_hash(&bytes),
            bytes,
        })
    }
}

/// Result of a cache check for one name.
enum Cached {
    Hit(Box<DatasetBundle>),
    Build(CacheOutcome),
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when a build completes.
    fn done(&self, bundle: &DatasetBundle);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn done(&self, _bundle: &DatasetBundle) {}
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Builds municipality datasets. Cheap to share across threads; every
/// collaborator is read-only.
pub struct Pipeline {
    config: PipelineConfig,
    cache: EnrichmentCache,
    reader: Arc<dyn SheetReader>,
    annotator: CategoryAnnotator,
    tek: Arc<dyn TekResolver>,
}

impl Pipeline {
    /// Pipeline reading `.xlsx` workbooks and annotating with the standard TEK table.
    pub fn new(config: PipelineConfig, resolver: Arc<CodeResolver>) -> Self {
        let cache = EnrichmentCache::new(&config.cache_dir, &config.imputed_cache_dir)
            .with_version(config.cache_version.clone());
        Self {
            config,
            cache,
            reader: Arc::new(XlsxReader::new()),
            annotator: CategoryAnnotator::new(resolver),
            tek: Arc::new(StandardTek),
        }
    }

    pub fn with_reader(mut self, reader: Arc<dyn SheetReader>) -> Self {
        self.reader = reader;
        self
    }

    pub fn with_tek(mut self, tek: Arc<dyn TekResolver>) -> Self {
        self.tek = tek;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn cache(&self) -> &EnrichmentCache {
        &self.cache
    }

    /// Locate and build `kommune` from the `source` directory.
    /// `Ok(None)` when no workbook exists for it.
    #[instrument(skip_all, fields(kommune = %kommune, source = %source))]
    pub fn build(
        &self,
        kommune: &str,
        source: DataSource,
        progress: &dyn ProgressReporter,
    ) -> Result<Option<DatasetBundle>> {
        progress.phase("Locating workbook");
        match locate(kommune, self.config.source_dir(source))? {
            LocateResult::NotFound => {
                info!("no workbook found");
                Ok(None)
            }
            LocateResult::Found { path, source } => {
                self.build_file(kommune, &path, source, progress).map(Some)
            }
        }
    }

    /// Build `kommune` from a known workbook; `source` selects the cache root.
    #[instrument(skip_all, fields(kommune = %kommune, path = %path.display()))]
    pub fn build_file(
        &self,
        kommune: &str,
        path: &Path,
        source: DataSource,
        progress: &dyn ProgressReporter,
    ) -> Result<DatasetBundle> {
        let start = Instant::now();
        let input = WorkbookInput::read(path, source)?;

        progress.phase("Checking cache");
        let outcome = match self.check_cache(kommune, &input) {
            Cached::Hit(bundle) => return Ok(self.served(*bundle, start, progress)),
            Cached::Build(outcome) => outcome,
        };

        progress.phase("Reading workbook");
        let raw = self.load_sheet(&input)?;
        self.build_sheet(kommune, &input, raw, outcome, start, progress)
    }

    /// Build a workbook found by a directory scan.
    ///
    /// The filename alone cannot tell whether a county suffix belongs to the
    /// municipality name, so the owner column decides: the candidate listed
    /// as owner on the most records names the dataset, falling back to the
    /// first candidate. A cache entry is served only under that same name.
    #[instrument(skip_all, fields(path = %file.path.display()))]
    pub fn build_workbook(
        &self,
        file: &WorkbookFile,
        progress: &dyn ProgressReporter,
    ) -> Result<DatasetBundle> {
        let start = Instant::now();
        let input = WorkbookInput::read(&file.path, file.source)?;

        progress.phase("Checking cache");
        let mut outcome = CacheOutcome::Miss;
        for candidate in &file.candidates {
            match self.check_cache(candidate, &input) {
                Cached::Hit(bundle) => {
                    let owner = resolve_owner_name(&bundle.unfiltered, &file.candidates)
                        .unwrap_or(&file.kommune);
                    if owner == candidate.as_str() {
                        return Ok(self.served(*bundle, start, progress));
                    }
                    debug!(
                        candidate = %candidate,
                        owner,
                        "ignoring entry cached under another name"
                    );
                }
                Cached::Build(rebuilt @ CacheOutcome::Rebuilt { .. })
                    if outcome == CacheOutcome::Miss =>
                {
                    outcome = rebuilt;
                }
                Cached::Build(_) => {}
            }
        }

        progress.phase("Reading workbook");
        let raw = self.load_sheet(&input)?;
        let kommune = resolve_owner_name(&raw, &file.candidates)
            .unwrap_or(&file.kommune)
            .to_string();
        info!(kommune = %kommune, candidates = file.candidates.len(), "named workbook");
        self.build_sheet(&kommune, &input, raw, outcome, start, progress)
    }

    fn check_cache(&self, kommune: &str, input: &WorkbookInput) -> Cached {
        match self.cache.lookup(&input.hash, kommune, input.source) {
            CacheLookup::Hit(entry) => {
                let (tables, statistics) = reconstruct(*entry, &input.hash);
                let cache_path = self.cache.cache_path(&input.hash, kommune, input.source);
                Cached::Hit(Box::new(assemble(
                    kommune,
                    input,
                    tables,
                    statistics,
                    CacheOutcome::Hit,
                    cache_path,
                )))
            }
            CacheLookup::Stale { reason } => Cached::Build(CacheOutcome::Rebuilt { reason }),
            CacheLookup::Miss => Cached::Build(CacheOutcome::Miss),
        }
    }

    fn served(
        &self,
        bundle: DatasetBundle,
        start: Instant,
        progress: &dyn ProgressReporter,
    ) -> DatasetBundle {
        info!(
            kommune = %bundle.kommune,
            rows = bundle.filtered.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "served from cache"
        );
        progress.done(&bundle);
        bundle
    }

    fn load_sheet(&self, input: &WorkbookInput) -> Result<RecordSet> {
        let raw = self.reader.read_sheet(&input.bytes)?;
        info!(rows = raw.len(), file = %input.path.display(), "loaded workbook");
        Ok(raw)
    }

    fn build_sheet(
        &self,
        kommune: &str,
        input: &WorkbookInput,
        raw: RecordSet,
        outcome: CacheOutcome,
        start: Instant,
        progress: &dyn ProgressReporter,
    ) -> Result<DatasetBundle> {
        let (tables, statistics) = self.enrich(raw, kommune, &input.hash, progress);
        let cache_path = self.cache.cache_path(&input.hash, kommune, input.source);
        let bundle = assemble(kommune, input, tables, statistics, outcome, cache_path);

        progress.phase("Writing cache");
        let entry = bundle.cache_entry(self.cache.version());
        self.cache.put(&entry, &input.hash, kommune, input.source)?;

        info!(
            kommune = %kommune,
            rows = bundle.filtered.len(),
            unfiltered = bundle.unfiltered.len(),
            excluded_status = bundle.excluded_status.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "built dataset"
        );
        progress.done(&bundle);
        Ok(bundle)
    }

    /// Common enrichment applied to both branches after filtering.
    fn annotate(&self, set: &mut RecordSet) {
        add_address_column(set);
        add_maps_link_column(set);
        self.annotator.annotate(set);
        annotate_tek(set, self.tek.as_ref());
    }

    fn enrich(
        &self,
        raw: RecordSet,
        kommune: &str,
        hash: &str,
        progress: &dyn ProgressReporter,
    ) -> (Tables, RunStatistics) {
        let source_rows = raw.len();

        progress.phase("Enriching unfiltered records");
        let mut unfiltered = raw.clone();
        backfill_alt_addresses(&mut unfiltered);
        add_cadastral_key_column(&mut unfiltered);
        self.annotate(&mut unfiltered);

        progress.phase("Filtering by ownership");
        let mut owned = filter_owned_records(raw, kommune);
        let ownership_filtered_out_rows = source_rows - owned.len();

        progress.phase("Enriching owned records");
        let address_backfilled_rows = backfill_alt_addresses(&mut owned);
        add_cadastral_key_column(&mut owned);
        let total_rows = owned.len();
        self.annotate(&mut owned);

        progress.phase("Splitting by status and merging duplicates");
        let (filtered, excluded_status) = split_by_status(owned);
        let tables = Tables {
            filtered_deduplicated: merge_duplicates(&filtered),
            unfiltered_deduplicated: merge_duplicates(&unfiltered),
            excluded_status_deduplicated: merge_duplicates(&excluded_status),
            filtered,
            unfiltered,
            excluded_status,
        };

        let mut statistics = RunStatistics {
            total_rows,
            source_rows,
            ownership_filtered_out_rows,
            address_backfilled_rows,
            ..RunStatistics::default()
        };
        tables.fill_statistics(&mut statistics, hash);
        (tables, statistics)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Rebuild the tables from a cache entry. Nested tables written by older
/// builds may be missing: dedups are recomputed, the unfiltered set falls
/// back to the primary one, and the excluded set is empty.
fn reconstruct(entry: CacheEntry, hash: &str) -> (Tables, RunStatistics) {
    let filtered = entry.primary_set();
    let unfiltered = entry
        .unfiltered
        .map(CachedTable::into_set)
        .unwrap_or_else(|| filtered.clone());
    let excluded_status = entry
        .excluded_status
        .map(CachedTable::into_set)
        .unwrap_or_else(|| filtered.empty_like());

    let filtered_deduplicated = entry
        .deduplicated
        .map(CachedTable::into_set)
        .unwrap_or_else(|| merge_duplicates(&filtered));
    let unfiltered_deduplicated = entry
        .unfiltered_deduplicated
        .map(CachedTable::into_set)
        .unwrap_or_else(|| merge_duplicates(&unfiltered));
    let excluded_status_deduplicated = entry
        .excluded_status_deduplicated
        .map(CachedTable::into_set)
        .unwrap_or_else(|| merge_duplicates(&excluded_status));

    let tables = Tables {
        filtered,
        filtered_deduplicated,
        unfiltered,
        unfiltered_deduplicated,
        excluded_status,
        excluded_status_deduplicated,
    };
    let mut statistics = entry.statistics;
    tables.fill_statistics(&mut statistics, hash);
    (tables, statistics)
}

fn assemble(
    kommune: &str,
    input: &WorkbookInput,
    tables: Tables,
    statistics: RunStatistics,
    cache: CacheOutcome,
    cache_path: PathBuf,
) -> DatasetBundle {
    DatasetBundle {
        kommune: kommune.to_string(),
        path: input.path.clone(),
        source: input.source,
        filtered: tables.filtered,
        filtered_deduplicated: tables.filtered_deduplicated,
        unfiltered: tables.unfiltered,
        unfiltered_deduplicated: tables.unfiltered_deduplicated,
        excluded_status: tables.excluded_status,
        excluded_status_deduplicated: tables.excluded_status_deduplicated,
        statistics,
        cache,
        cache_path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use matrikkel_shared::columns::*;
    use matrikkel_shared::PropertyRecord;
    use serde_json::{Map, Value, json};
    use uuid::Uuid;

    /// Reads workbook bytes as `{"columns": [...], "rows": [{...}]}`.
    struct JsonSheetReader;

    impl SheetReader for JsonSheetReader {
        fn read_sheet(&self, bytes: &[u8]) -> Result<RecordSet> {
            let doc: Value = serde_json::from_slice(bytes)
                .map_err(|e| MatrikkelError::Workbook(e.to_string()))?;
            let columns: Vec<String> = serde_json::from_value(doc["columns"].clone())
                .map_err(|e| MatrikkelError::Workbook(e.to_string()))?;
            let rows: Vec<Map<String, Value>> = serde_json::from_value(doc["rows"].clone())
                .map_err(|e| MatrikkelError::Workbook(e.to_string()))?;
            Ok(RecordSet::from_rows(columns, rows))
        }
    }

    struct Fixture {
        root: PathBuf,
        config: PipelineConfig,
    }

    impl Fixture {
        fn new() -> Self {
            let root = std::env::temp_dir().join(format!("matrikkel_pipeline_{}", Uuid::now_v7()));
            let config = PipelineConfig {
                raw_dir: root.join("raw"),
                imputed_dir: root.join("imputed"),
                cache_dir: root.join("cache"),
                imputed_cache_dir: root.join("cache_imputed"),
                cache_version: "v4".into(),
            };
            std::fs::create_dir_all(&config.raw_dir).unwrap();
            Self { root, config }
        }

        fn pipeline(&self, version: &str) -> Pipeline {
            let mut config = self.config.clone();
            config.cache_version = version.into();
            Pipeline::new(config, Arc::new(CodeResolver::bundled().unwrap()))
                .with_reader(Arc::new(JsonSheetReader))
        }

        fn write_workbook(&self, name: &str) -> PathBuf {
            self.write_sheet(name, &sheet())
        }

        fn write_sheet(&self, name: &str, doc: &Value) -> PathBuf {
            let path = self.config.raw_dir.join(name);
            std::fs::write(&path, serde_json::to_vec(doc).unwrap()).unwrap();
            path
        }
    }

    impl Drop for Fixture {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.root);
        }
    }

    /// Owner names, role codes and shares.
    type Owners<'a> = (&'a str, &'a str, &'a str);

    /// Group key, duplicate flag and sub-units.
    type Group<'a> = (&'a str, &'a str, &'a str);

    fn building(
        gnr: i64,
        street: Option<&str>,
        owners: Owners,
        status: i64,
        group: Option<Group>,
    ) -> Value {
        let (group_key, flag, units) = group.unwrap_or(("", "Unique", ""));
        json!({
            KOMMUNE_NR: 4601,
            GARDS_NR: gnr,
            BRUKS_NR: 1,
            BYGNINGSTYPE_KODE_ID: 104,
            BYGNINGSSTATUS_KODE_ID: status,
            TIDLIGSTE_STATUS_DATO: "1999-05-01 00:00:00",
            ADRESSENAVN: street,
            NUMMER: street.map(|_| 1),
            POSTNUMMER: street.map(|_| 5003),
            POSTSTED: street.map(|_| "Bergen"),
            ALLE_EIERE: owners.0,
            ALLE_EIERFORHOLD_KODE_IDS: owners.1,
            ALLE_EIERANDELER: owners.2,
            UNDERENHETER: units,
            DUPLIKAT_FLAGG: flag,
            DUPLIKAT_GRUPPE: group_key,
        })
    }

    fn columns() -> Value {
        json!([
            KOMMUNE_NR, GARDS_NR, BRUKS_NR, BYGNINGSTYPE_KODE_ID, BYGNINGSSTATUS_KODE_ID,
            TIDLIGSTE_STATUS_DATO, ADRESSENAVN, NUMMER, POSTNUMMER, POSTSTED, ALLE_EIERE,
            ALLE_EIERFORHOLD_KODE_IDS, ALLE_EIERANDELER, UNDERENHETER, DUPLIKAT_FLAGG,
            DUPLIKAT_GRUPPE,
        ])
    }

    fn sheet() -> Value {
        let kommune = ("Bergen kommune", "0", "100");
        let primary = ("G1", "Primary", "Acme AS [Retail, 123]");
        let duplicate = (
            "G1",
            "Duplicate",
            "Acme AS [Retail, 123]; Beta AS [Services, 456]",
        );
        let shared = ("Bergen kommune; Statsbygg", "0; 1", "100; 5");
        json!({
            "columns": columns(),
            "rows": [
                building(5, Some("Torget"), kommune, 4, Some(primary)),
                building(5, None, kommune, 4, Some(duplicate)),
                building(6, Some("Bryggen"), kommune, 1, None),
                building(7, Some("Strandkaien"), ("Privat Person", "0", "100"), 4, None),
                building(8, Some("Nygårdsgaten"), shared, 4, None),
            ],
        })
    }

    #[test]
    fn builds_all_six_sets() {
        let fx = Fixture::new();
        fx.write_workbook("4601_Bergen_Properties.xlsx");

        let bundle = fx
            .pipeline("v4")
            .build("Bergen", DataSource::Raw, &SilentProgress)
            .unwrap()
            .expect("workbook exists");

        assert_eq!(bundle.cache, CacheOutcome::Miss);
        assert_eq!(bundle.unfiltered.len(), 5);
        assert_eq!(bundle.filtered.len(), 2);
        assert_eq!(bundle.excluded_status.len(), 1);
        assert_eq!(bundle.filtered_deduplicated.len(), 1);
        assert_eq!(bundle.unfiltered_deduplicated.len(), 4);

        let stats = &bundle.statistics;
        assert_eq!(stats.source_rows, 5);
        assert_eq!(stats.total_rows, 3);
        assert_eq!(stats.ownership_filtered_out_rows, 2);
        assert_eq!(stats.address_backfilled_rows, 1);
        assert_eq!(stats.filtered_out_rows, 3);
        assert_eq!(stats.filtered_out_status_rows, 1);
        assert_eq!(stats.deduplicated_rows, 1);
        assert_eq!(stats.file_hash.len(), 8);

        let survivor = &bundle.filtered_deduplicated.records[0];
        assert_eq!(survivor.int(ANTALL_UNDERENHETER), Some(2));
        assert_eq!(survivor.raw_text(BYGNINGSTYPE), "Kirke, kapell");
        assert_eq!(survivor.raw_text(TEK_STANDARD), "TEK97");
        assert_eq!(survivor.raw_text(KNR_GNR_BNR), "4601-5-1");
        assert!(survivor.raw_text(GOOGLE_MAPS_LINK).contains("Torget+1"));

        let sibling = &bundle.filtered.records[1];
        assert_eq!(sibling.raw_text(ALT_ADRESSER), "Torget 1, 5003 Bergen");
        assert!(bundle.cache_path.is_file());
    }

    #[test]
    fn rebuild_is_byte_identical_and_second_run_hits() {
        let fx = Fixture::new();
        fx.write_workbook("4601_Bergen_Properties.xlsx");
        let pipeline = fx.pipeline("v4");

        let first = pipeline.build("Bergen", DataSource::Raw, &SilentProgress).unwrap().unwrap();
        let first_bytes = std::fs::read(&first.cache_path).unwrap();

        let hit = pipeline.build("Bergen", DataSource::Raw, &SilentProgress).unwrap().unwrap();
        assert_eq!(hit.cache, CacheOutcome::Hit);
        assert_eq!(hit.statistics, first.statistics);
        assert_eq!(hit.filtered, first.filtered);
        assert_eq!(
            hit.excluded_status_deduplicated.len(),
            first.excluded_status_deduplicated.len()
        );

        std::fs::remove_file(&first.cache_path).unwrap();
        let again = pipeline.build("Bergen", DataSource::Raw, &SilentProgress).unwrap().unwrap();
        assert_eq!(again.cache, CacheOutcome::Miss);
        assert_eq!(std::fs::read(&again.cache_path).unwrap(), first_bytes);
    }

    #[test]
    fn older_cache_version_is_rebuilt() {
        let fx = Fixture::new();
        fx.write_workbook("4601_Bergen_Properties.xlsx");

        let v3 = fx
            .pipeline("v3")
            .build("Bergen", DataSource::Raw, &SilentProgress)
            .unwrap()
            .unwrap();
        assert_eq!(v3.cache, CacheOutcome::Miss);

        let v4 = fx.pipeline("v4");
        let rebuilt = v4.build("Bergen", DataSource::Raw, &SilentProgress).unwrap().unwrap();
        assert!(matches!(
            rebuilt.cache,
            CacheOutcome::Rebuilt { ref reason } if reason.contains("v3")
        ));
        assert_eq!(rebuilt.cache_path, v3.cache_path);

        let hit = v4.build("Bergen", DataSource::Raw, &SilentProgress).unwrap().unwrap();
        assert_eq!(hit.cache, CacheOutcome::Hit);
    }

    #[test]
    fn missing_nested_tables_are_recomputed() {
        let fx = Fixture::new();
        fx.write_workbook("4601_Bergen_Properties.xlsx");
        let pipeline = fx.pipeline("v4");
        let built = pipeline.build("Bergen", DataSource::Raw, &SilentProgress).unwrap().unwrap();

        let mut entry = built.cache_entry("v4");
        entry.deduplicated = None;
        entry.unfiltered = None;
        entry.unfiltered_deduplicated = None;
        entry.excluded_status = None;
        entry.excluded_status_deduplicated = None;
        std::fs::write(&built.cache_path, serde_json::to_vec(&entry).unwrap()).unwrap();

        let hit = pipeline.build("Bergen", DataSource::Raw, &SilentProgress).unwrap().unwrap();
        assert_eq!(hit.cache, CacheOutcome::Hit);
        assert_eq!(hit.filtered_deduplicated.len(), 1);
        assert_eq!(hit.unfiltered.len(), hit.filtered.len());
        assert!(hit.excluded_status.is_empty());
        assert_eq!(hit.statistics.unfiltered_rows, 2);
        assert_eq!(hit.statistics.excluded_status_rows, 0);
        assert_eq!(hit.statistics.source_rows, 5);
    }

    #[test]
    fn unknown_municipality_is_not_found() {
        let fx = Fixture::new();
        fx.write_workbook("4601_Bergen_Properties.xlsx");
        let result = fx.pipeline("v4").build("Tromsø", DataSource::Raw, &SilentProgress).unwrap();
        assert!(result.is_none());

        let result = fx
            .pipeline("v4")
            .build("Bergen", DataSource::Imputed, &SilentProgress)
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn scanned_county_suffixed_workbook_uses_owner_name() {
        let fx = Fixture::new();
        let owned = ("Herøy kommune", "0", "100");
        let doc = json!({
            "columns": columns(),
            "rows": [
                building(3, Some("Fosnavågvegen"), owned, 4, None),
                building(4, Some("Myklebust"), owned, 1, None),
                building(9, Some("Kaivegen"), ("Privat Person", "0", "100"), 4, None),
            ],
        });
        fx.write_sheet("1515_Herøy_Møre_og_Romsdal_Properties.xlsx", &doc);

        let files = matrikkel_locator::scan(&fx.config.raw_dir).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].kommune, "Herøy Møre og Romsdal");

        let pipeline = fx.pipeline("v4");
        let bundle = pipeline.build_workbook(&files[0], &SilentProgress).unwrap();
        assert_eq!(bundle.kommune, "Herøy");
        assert_eq!(bundle.cache, CacheOutcome::Miss);
        assert_eq!(bundle.filtered.len(), 1);
        assert_eq!(bundle.excluded_status.len(), 1);
        assert_eq!(bundle.unfiltered.len(), 3);
        let cache_name = bundle.cache_path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(cache_name.starts_with("Herøy_"), "{cache_name}");

        let again = pipeline.build_workbook(&files[0], &SilentProgress).unwrap();
        assert_eq!(again.cache, CacheOutcome::Hit);
        assert_eq!(again.kommune, "Herøy");
        assert_eq!(again.filtered.len(), bundle.filtered.len());
    }

    #[test]
    fn scanned_workbook_ignores_entry_cached_under_unlisted_name() {
        let fx = Fixture::new();
        let owned = ("Herøy kommune", "0", "100");
        let doc = json!({
            "columns": columns(),
            "rows": [building(3, Some("Fosnavågvegen"), owned, 4, None)],
        });
        let path = fx.write_sheet("1515_Herøy_Møre_og_Romsdal_Properties.xlsx", &doc);
        let pipeline = fx.pipeline("v4");

        let misnamed = pipeline
            .build_file("Herøy Møre og Romsdal", &path, DataSource::Raw, &SilentProgress)
            .unwrap();
        assert!(misnamed.filtered.is_empty());

        let files = matrikkel_locator::scan(&fx.config.raw_dir).unwrap();
        let bundle = pipeline.build_workbook(&files[0], &SilentProgress).unwrap();
        assert_eq!(bundle.kommune, "Herøy");
        assert_eq!(bundle.cache, CacheOutcome::Miss);
        assert_eq!(bundle.filtered.len(), 1);
    }

    #[test]
    fn scanned_workbook_without_listed_owner_keeps_first_name() {
        let fx = Fixture::new();
        fx.write_workbook("3451_Nord_Aurdal_Properties.xlsx");

        let files = matrikkel_locator::scan(&fx.config.raw_dir).unwrap();
        let bundle = fx.pipeline("v4").build_workbook(&files[0], &SilentProgress).unwrap();
        assert_eq!(bundle.kommune, "Nord Aurdal");
        assert!(bundle.filtered.is_empty());
        assert_eq!(bundle.unfiltered.len(), 5);
    }

    #[test]
    fn unreadable_sheet_is_an_error() {
        let fx = Fixture::new();
        let path = fx.config.raw_dir.join("4601_Bergen_Properties.xlsx");
        std::fs::write(&path, b"not json").unwrap();
        let err = fx.pipeline("v4").build("Bergen", DataSource::Raw, &SilentProgress).unwrap_err();
        assert!(matches!(err, MatrikkelError::Workbook(_)));
    }

    #[test]
    fn sheet_without_ownership_columns_keeps_only_unfiltered() {
        let fx = Fixture::new();
        let mut r = PropertyRecord::new();
        r.set(BYGNINGSTYPE_KODE_ID, 104);
        let doc = json!({"columns": [BYGNINGSTYPE_KODE_ID], "rows": [r]});
        std::fs::write(
            fx.config.raw_dir.join("4601_Bergen_Properties.xlsx"),
            serde_json::to_vec(&doc).unwrap(),
        )
        .unwrap();

        let bundle = fx
            .pipeline("v4")
            .build("Bergen", DataSource::Raw, &SilentProgress)
            .unwrap()
            .unwrap();
        assert!(bundle.filtered.is_empty());
        assert_eq!(bundle.unfiltered.len(), 1);
        assert_eq!(
            bundle.unfiltered.records[0].raw_text(FORENKLET_BYGNINGS_KATEGORI),
            "Kirker og religiøse bygg"
        );
        assert!(bundle.filtered.has_column(FORENKLET_BYGNINGS_KATEGORI));
    }
}
