// Archivo: enrich.rs
// Propósito: orquestar el enriquecimiento de la tabla de hits: secuencias
// completas, linaje taxonómico y perfiles fisicoquímicos. Los fallos son
// por fila y se acumulan; nunca abortan las filas hermanas.
use crate::memo::MemoizedPropertyCalculator;
use crate::taxonomy::CachedTaxonomyResolver;
use futures::stream::{self, StreamExt};
use prot_domain::{sequence_hash, DomainError, HitTable, PhysicochemicalProfile, SequenceSource, TaxonLineage};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Etapa del enriquecimiento en la que ocurrió un fallo de fila.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EnrichStage {
    SequenceFetch,
    TaxonomyLookup,
    PropertyComputation,
}

impl fmt::Display for EnrichStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EnrichStage::SequenceFetch => "sequence_fetch",
            EnrichStage::TaxonomyLookup => "taxonomy_lookup",
            EnrichStage::PropertyComputation => "property_computation",
        };
        write!(f, "{}", name)
    }
}

/// Fallo aislado de una fila durante el enriquecimiento. `key` identifica
/// la unidad afectada: accesión para secuencias y propiedades, id de taxón
/// para linajes.
#[derive(Debug, Clone, Serialize)]
pub struct RowFailure {
    pub stage: EnrichStage,
    pub key: String,
    pub message: String,
}

/// Anotaciones producidas por una corrida de enriquecimiento, adjuntas por
/// join de clave y nunca incrustadas destructivamente en las filas:
/// linajes por `taxon_id` y perfiles por hash de contenido de la
/// secuencia. `failures` es la lista explícita de fallos por fila; el
/// caller decide si el enriquecimiento parcial le resulta aceptable.
#[derive(Debug, Default)]
pub struct AnnotationSet {
    pub lineages: HashMap<u32, TaxonLineage>,
    pub profiles: HashMap<String, Arc<PhysicochemicalProfile>>,
    pub failures: Vec<RowFailure>,
}

impl AnnotationSet {
    /// Linaje anotado para un hit, si su taxón se resolvió.
    pub fn lineage_for(&self, hit: &prot_domain::Hit) -> Option<&TaxonLineage> {
        hit.taxon_id.and_then(|id| self.lineages.get(&id))
    }

    /// Perfil anotado para un hit, si su secuencia se obtuvo y calculó.
    pub fn profile_for(&self, hit: &prot_domain::Hit) -> Option<&Arc<PhysicochemicalProfile>> {
        hit.full_sequence
           .as_ref()
           .and_then(|seq| self.profiles.get(&sequence_hash(seq)))
    }
}

/// Opciones del enriquecimiento.
#[derive(Debug, Clone)]
pub struct EnrichmentOptions {
    /// Límite de operaciones de red en vuelo por etapa.
    pub concurrency: usize,
}

impl Default for EnrichmentOptions {
    fn default() -> Self {
        Self { concurrency: 8 }
    }
}

enum Event {
    Sequence(String, Result<Option<String>, DomainError>),
    Lineage(u32, Result<TaxonLineage, DomainError>),
}

/// Pipeline de enriquecimiento sobre fuentes inyectadas.
///
/// La tabla de dominios es transparente al enriquecimiento y no participa.
/// Las etapas de secuencia y taxonomía corren concurrentemente entre sí
/// (operan sobre columnas disjuntas); el cálculo de propiedades espera a
/// que su secuencia esté disponible. Los resultados se aplican a la tabla
/// a medida que llegan: cancelar el futuro conserva las filas ya
/// enriquecidas (progreso parcial, sin rollback).
pub struct EnrichmentPipeline {
    sequences: Arc<dyn SequenceSource>,
    taxonomy: Arc<CachedTaxonomyResolver>,
    calculator: Arc<MemoizedPropertyCalculator>,
    options: EnrichmentOptions,
}

impl EnrichmentPipeline {
    pub fn new(sequences: Arc<dyn SequenceSource>,
               taxonomy: Arc<CachedTaxonomyResolver>,
               calculator: Arc<MemoizedPropertyCalculator>,
               options: EnrichmentOptions)
               -> Self {
        Self { sequences, taxonomy, calculator, options }
    }

    /// Enriquece la tabla de hits in situ y devuelve las anotaciones.
    pub async fn enrich(&self, hits: &mut HitTable) -> AnnotationSet {
        let mut annotations = AnnotationSet::default();

        // Unidades de trabajo distintas: accesiones sin secuencia y taxones.
        let mut accessions: Vec<String> = Vec::new();
        let mut seen_accessions = HashSet::new();
        let mut taxa: Vec<u32> = Vec::new();
        let mut seen_taxa = HashSet::new();
        let mut rows_by_accession: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, hit) in hits.rows().iter().enumerate() {
            if hit.full_sequence.is_none() {
                rows_by_accession.entry(hit.target_accession.clone()).or_default().push(idx);
                if seen_accessions.insert(hit.target_accession.clone()) {
                    accessions.push(hit.target_accession.clone());
                }
            }
            if let Some(taxon_id) = hit.taxon_id {
                if seen_taxa.insert(taxon_id) {
                    taxa.push(taxon_id);
                }
            }
        }
        tracing::info!(accesiones = accessions.len(), taxones = taxa.len(), "iniciando enriquecimiento");

        let limit = self.options.concurrency.max(1);
        let sequences = Arc::clone(&self.sequences);
        let seq_stream = stream::iter(accessions.into_iter().map(move |accession| {
                             let source = Arc::clone(&sequences);
                             async move {
                                 let result = source.fetch(&accession).await;
                                 Event::Sequence(accession, result)
                             }
                         }))
                         .buffer_unordered(limit);
        let taxonomy = Arc::clone(&self.taxonomy);
        let tax_stream = stream::iter(taxa.into_iter().map(move |taxon_id| {
                             let resolver = Arc::clone(&taxonomy);
                             async move {
                                 let result = resolver.resolve(taxon_id).await;
                                 Event::Lineage(taxon_id, result)
                             }
                         }))
                         .buffer_unordered(limit);

        // Aplicar cada resultado en cuanto llega: el progreso parcial queda
        // en la tabla aunque el futuro se cancele a mitad de vuelo.
        let mut merged = stream::select(seq_stream, tax_stream);
        while let Some(event) = merged.next().await {
            match event {
                Event::Sequence(accession, Ok(Some(sequence))) => {
                    if let Some(indices) = rows_by_accession.get(&accession) {
                        for &idx in indices {
                            hits.rows_mut()[idx].full_sequence = Some(sequence.clone());
                        }
                    }
                }
                Event::Sequence(accession, Ok(None)) => {
                    annotations.failures.push(RowFailure { stage: EnrichStage::SequenceFetch,
                                                           key: accession.clone(),
                                                           message: "accesión no encontrada en la fuente".to_string() });
                }
                Event::Sequence(accession, Err(e)) => {
                    tracing::warn!(%accession, error = %e, "fallo al obtener secuencia");
                    annotations.failures.push(RowFailure { stage: EnrichStage::SequenceFetch,
                                                           key: accession,
                                                           message: e.to_string() });
                }
                Event::Lineage(taxon_id, Ok(lineage)) => {
                    annotations.lineages.insert(taxon_id, lineage);
                }
                Event::Lineage(taxon_id, Err(e)) => {
                    tracing::warn!(taxon_id, error = %e, "fallo al resolver linaje");
                    annotations.failures.push(RowFailure { stage: EnrichStage::TaxonomyLookup,
                                                           key: taxon_id.to_string(),
                                                           message: e.to_string() });
                }
            }
        }

        // Etapa de propiedades: una vez por secuencia distinta ya resuelta.
        let mut processed_hashes = HashSet::new();
        for hit in hits.rows() {
            let Some(sequence) = hit.full_sequence.as_ref() else {
                continue;
            };
            let hash = sequence_hash(sequence);
            if !processed_hashes.insert(hash.clone()) {
                continue;
            }
            match self.calculator.compute(sequence) {
                Ok(profile) => {
                    annotations.profiles.insert(hash, profile);
                }
                Err(e) => {
                    annotations.failures.push(RowFailure { stage: EnrichStage::PropertyComputation,
                                                           key: hit.target_accession.clone(),
                                                           message: e.to_string() });
                }
            }
        }

        tracing::info!(linajes = annotations.lineages.len(),
                       perfiles = annotations.profiles.len(),
                       fallos = annotations.failures.len(),
                       "enriquecimiento terminado");
        annotations
    }
}
