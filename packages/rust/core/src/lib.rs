//! Enrichment stages and pipeline orchestration for municipality property data.
//!
//! Each stage module transforms a [`RecordSet`](matrikkel_shared::RecordSet)
//! in place or returns a new one; [`pipeline::Pipeline`] runs them in order,
//! backed by the content-addressed cache in `matrikkel-storage`.

pub mod address;
pub mod category;
pub mod dedup;
pub mod maps;
pub mod ownership;
pub mod pipeline;
pub mod status;
pub mod tek;

pub use pipeline::{
    CacheOutcome, DatasetBundle, Pipeline, PipelineConfig, ProgressReporter, SilentProgress,
};
