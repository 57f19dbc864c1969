// normalize.rs
use crate::{verify_integrity, Domain, DomainError, Hit, DomainTable, HitTable};
use search::RawNestedResult;

/// Aplana un resultado anidado (query → hit → dominio) en las dos tablas
/// relacionales enlazadas.
///
/// Recorrido en profundidad con asignación de claves superficiales
/// monotónicas, determinista para una misma entrada. Un hit sin dominios
/// produce una fila de hit y cero filas de dominio (sin placeholders).
pub fn normalize(raw: &RawNestedResult) -> Result<(HitTable, DomainTable), DomainError> {
  normalize_all(std::slice::from_ref(raw))
}

/// Normaliza varios resultados crudos (por ejemplo, los jobs de un fan-out)
/// concatenándolos como si vinieran de un solo job. Las claves superficiales
/// se re-escalan para ser globalmente únicas en la concatenación.
pub fn normalize_all(raws: &[RawNestedResult]) -> Result<(HitTable, DomainTable), DomainError> {
  let mut hits = HitTable::new();
  let mut domains = DomainTable::new();
  let mut next_hit_id = 1u64;
  let mut next_domain_id = 1u64;

  for raw in raws {
    for query in &raw.queries {
      for raw_hit in &query.hits {
        let hit_id = next_hit_id;
        next_hit_id += 1;
        hits.push(Hit { hit_id,
                        query_id: query.query_id.clone(),
                        target_accession: raw_hit.target_accession.clone(),
                        full_sequence_evalue: raw_hit.full_sequence_evalue,
                        full_sequence_score: raw_hit.full_sequence_score,
                        full_sequence: None,
                        taxon_id: raw_hit.taxon_id,
                        description: raw_hit.description.clone() });
        for raw_domain in &raw_hit.domains {
          if raw_domain.align_start == 0 || raw_domain.align_end < raw_domain.align_start {
            return Err(DomainError::ValidationError(format!(
              "coordenadas de alineamiento inválidas en el hit {}: {}..{}",
              raw_hit.target_accession, raw_domain.align_start, raw_domain.align_end
            )));
          }
          domains.push(Domain { domain_id: next_domain_id,
                                hit_id,
                                domain_evalue: raw_domain.independent_evalue,
                                score: raw_domain.score,
                                align_start: raw_domain.align_start,
                                align_end: raw_domain.align_end });
          next_domain_id += 1;
        }
      }
    }
  }

  verify_integrity(&hits, &domains)?;
  Ok((hits, domains))
}
