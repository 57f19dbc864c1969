//! prot-pipeline: orquestación del enriquecimiento y la curación
//!
//! Crate que orquesta las capas inferiores (`search`, `prot-domain`) para
//! enriquecer las tablas normalizadas con secuencias completas, linaje
//! taxonómico y perfiles fisicoquímicos, y para curarlas por deduplicación
//! y umbral de e-value. El artefacto final son dos tablas planas enlazadas
//! exportables como JSON.

pub mod curation;
pub mod enrich;
pub mod errors;
pub mod export;
pub mod memo;
pub mod taxonomy;

pub use curation::{deduplicate, filter_by_evalue, DedupOutcome, FilterOutcome};
pub use enrich::{AnnotationSet, EnrichStage, EnrichmentOptions, EnrichmentPipeline, RowFailure};
pub use errors::PipelineError;
pub use export::{build_export, to_json_string, write_json, CuratedExport, HitRecord};
pub use memo::MemoizedPropertyCalculator;
pub use taxonomy::{CachedTaxonomyResolver, TaxonomyMode};
