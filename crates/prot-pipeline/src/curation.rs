// Archivo: curation.rs
// Propósito: filtros de curación sobre las tablas enriquecidas:
// deduplicación por (secuencia, taxón) y filtrado por umbral de e-value con
// detección del desacuerdo entre significancia de secuencia completa y de
// dominio.
use crate::errors::PipelineError;
use prot_domain::{verify_integrity, DomainTable, HitTable};
use std::collections::{HashMap, HashSet};

/// Resultado de la deduplicación.
#[derive(Debug)]
pub struct DedupOutcome {
    pub hits: HitTable,
    pub domains: DomainTable,
    /// Hits eliminados por ser duplicados posteriores de una clave ya vista.
    pub removed_duplicates: Vec<u64>,
    /// Hits descartados explícitamente por carecer de secuencia: la clave de
    /// deduplicación requiere contenido de secuencia.
    pub dropped_missing_sequence: Vec<u64>,
}

/// Deduplica hits por la clave (secuencia completa, taxón), conservando la
/// primera aparición en el orden original de la tabla. Los dominios de los
/// duplicados eliminados se eliminan con ellos.
pub fn deduplicate(hits: HitTable, mut domains: DomainTable) -> Result<DedupOutcome, PipelineError> {
    let mut seen: HashSet<(String, Option<u32>)> = HashSet::new();
    let mut kept = HitTable::new();
    let mut removed_duplicates = Vec::new();
    let mut dropped_missing_sequence = Vec::new();

    for hit in hits.rows() {
        match &hit.full_sequence {
            None => dropped_missing_sequence.push(hit.hit_id),
            Some(sequence) => {
                if seen.insert((sequence.clone(), hit.taxon_id)) {
                    kept.push(hit.clone());
                } else {
                    removed_duplicates.push(hit.hit_id);
                }
            }
        }
    }

    let kept_ids = kept.ids();
    domains.retain(|d| kept_ids.contains(&d.hit_id));
    verify_integrity(&kept, &domains)?;
    tracing::info!(conservados = kept.len(),
                   duplicados = removed_duplicates.len(),
                   sin_secuencia = dropped_missing_sequence.len(),
                   "deduplicación terminada");
    Ok(DedupOutcome { hits: kept, domains, removed_duplicates, dropped_missing_sequence })
}

/// Resultado del filtrado por e-value.
#[derive(Debug)]
pub struct FilterOutcome {
    pub hits: HitTable,
    pub domains: DomainTable,
    /// Hits retenidos cuyo e-value de secuencia completa es significativo
    /// pero que perdieron todos sus dominios en el filtrado: el estado de
    /// desacuerdo que la curación expone en lugar de resolver en silencio.
    pub red_flags: Vec<u64>,
}

/// Filtra por umbral de e-value: retiene hits con
/// `full_sequence_evalue <= threshold` y, de forma independiente, dominios
/// con `domain_evalue <= threshold` (de los hits retenidos). Nunca elimina
/// en cascada un hit por quedarse sin dominios significativos; ese caso se
/// reporta en `red_flags`.
pub fn filter_by_evalue(hits: HitTable,
                        mut domains: DomainTable,
                        threshold: f64)
                        -> Result<FilterOutcome, PipelineError> {
    if !threshold.is_finite() || threshold < 0.0 {
        return Err(PipelineError::Validation(format!("umbral de e-value inválido: {}", threshold)));
    }

    // dominios por hit antes del filtro, para detectar el desacuerdo
    let mut domains_before: HashMap<u64, usize> = HashMap::new();
    for domain in domains.rows() {
        *domains_before.entry(domain.hit_id).or_insert(0) += 1;
    }

    let mut kept_hits = hits;
    kept_hits.retain(|h| h.full_sequence_evalue <= threshold);
    let kept_ids = kept_hits.ids();
    domains.retain(|d| kept_ids.contains(&d.hit_id) && d.domain_evalue <= threshold);

    let mut domains_after: HashMap<u64, usize> = HashMap::new();
    for domain in domains.rows() {
        *domains_after.entry(domain.hit_id).or_insert(0) += 1;
    }

    let red_flags: Vec<u64> = kept_hits.rows()
                                       .iter()
                                       .filter(|h| {
                                           domains_before.get(&h.hit_id).copied().unwrap_or(0) > 0
                                           && domains_after.get(&h.hit_id).copied().unwrap_or(0) == 0
                                       })
                                       .map(|h| h.hit_id)
                                       .collect();

    verify_integrity(&kept_hits, &domains)?;
    tracing::info!(hits = kept_hits.len(),
                   dominios = domains.len(),
                   desacuerdos = red_flags.len(),
                   "filtrado por e-value terminado");
    Ok(FilterOutcome { hits: kept_hits, domains, red_flags })
}
