// Archivo: export.rs
// Propósito: serializar las tablas curadas como dos conjuntos de registros
// planos enlazados por `hit_id`, con el linaje y los índices fisicoquímicos
// unidos por clave a cada fila de hit.
use crate::enrich::AnnotationSet;
use crate::errors::PipelineError;
use indexmap::IndexMap;
use prot_domain::{Domain, DomainTable, HitTable};
use serde::Serialize;
use std::io::Write;

/// Fila de hit exportable: columnas propias más las columnas unidas del
/// linaje y del perfil (ausentes si la fila no llegó a enriquecerse).
#[derive(Debug, Clone, Serialize)]
pub struct HitRecord {
    pub hit_id: u64,
    pub query_id: String,
    pub target_accession: String,
    pub full_sequence_evalue: f64,
    pub full_sequence_score: f64,
    pub taxon_id: Option<u32>,
    pub description: Option<String>,
    pub full_sequence: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lineage: Option<IndexMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<IndexMap<String, f64>>,
}

/// Artefacto exportable: tablas de hits y dominios enlazadas por `hit_id`.
#[derive(Debug, Clone, Serialize)]
pub struct CuratedExport {
    pub hits: Vec<HitRecord>,
    pub domains: Vec<Domain>,
}

/// Construye el artefacto uniendo anotaciones a cada fila de hit.
pub fn build_export(hits: &HitTable, domains: &DomainTable, annotations: &AnnotationSet) -> CuratedExport {
    let hit_records = hits.rows()
                          .iter()
                          .map(|hit| HitRecord { hit_id: hit.hit_id,
                                                 query_id: hit.query_id.clone(),
                                                 target_accession: hit.target_accession.clone(),
                                                 full_sequence_evalue: hit.full_sequence_evalue,
                                                 full_sequence_score: hit.full_sequence_score,
                                                 taxon_id: hit.taxon_id,
                                                 description: hit.description.clone(),
                                                 full_sequence: hit.full_sequence.clone(),
                                                 lineage: annotations.lineage_for(hit)
                                                                     .map(|l| l.ranks().clone()),
                                                 properties: annotations.profile_for(hit)
                                                                        .map(|p| p.values().clone()) })
                          .collect();
    CuratedExport { hits: hit_records, domains: domains.rows().to_vec() }
}

/// Escribe el artefacto como JSON en cualquier `io::Write`.
pub fn write_json<W: Write>(writer: W, export: &CuratedExport) -> Result<(), PipelineError> {
    serde_json::to_writer_pretty(writer, export)?;
    Ok(())
}

/// Serializa el artefacto como cadena JSON.
pub fn to_json_string(export: &CuratedExport) -> Result<String, PipelineError> {
    Ok(serde_json::to_string_pretty(export)?)
}
