// tables.rs
use crate::DomainError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Fila de la tabla de hits: una secuencia objetivo emparejada para una
/// consulta. `full_sequence` es nula hasta el enriquecimiento; `taxon_id`
/// puede faltar si el servicio no lo reporta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit {
  pub hit_id: u64,
  pub query_id: String,
  pub target_accession: String,
  pub full_sequence_evalue: f64,
  pub full_sequence_score: f64,
  pub full_sequence: Option<String>,
  pub taxon_id: Option<u32>,
  pub description: Option<String>,
}

/// Fila de la tabla de dominios: una región alineada dentro de un hit, con
/// e-value independiente del e-value de secuencia completa del hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Domain {
  pub domain_id: u64,
  pub hit_id: u64,
  pub domain_evalue: f64,
  pub score: f64,
  /// Coordenadas 1-based inclusivas; `align_end >= align_start`.
  pub align_start: u32,
  pub align_end: u32,
}

/// Tabla plana de hits con clave superficial entera, en orden de inserción.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HitTable {
  rows: Vec<Hit>,
}

impl HitTable {
  pub fn new() -> Self {
    Self { rows: Vec::new() }
  }

  pub fn push(&mut self, hit: Hit) {
    self.rows.push(hit);
  }

  pub fn rows(&self) -> &[Hit] {
    &self.rows
  }

  pub fn rows_mut(&mut self) -> &mut [Hit] {
    &mut self.rows
  }

  pub fn get(&self, hit_id: u64) -> Option<&Hit> {
    self.rows.iter().find(|h| h.hit_id == hit_id)
  }

  pub fn contains(&self, hit_id: u64) -> bool {
    self.rows.iter().any(|h| h.hit_id == hit_id)
  }

  pub fn retain<F>(&mut self, f: F)
    where F: FnMut(&Hit) -> bool
  {
    self.rows.retain(f);
  }

  pub fn len(&self) -> usize {
    self.rows.len()
  }

  pub fn is_empty(&self) -> bool {
    self.rows.is_empty()
  }

  /// Conjunto de claves superficiales presentes.
  pub fn ids(&self) -> HashSet<u64> {
    self.rows.iter().map(|h| h.hit_id).collect()
  }
}

/// Tabla plana de dominios, en orden de inserción.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomainTable {
  rows: Vec<Domain>,
}

impl DomainTable {
  pub fn new() -> Self {
    Self { rows: Vec::new() }
  }

  pub fn push(&mut self, domain: Domain) {
    self.rows.push(domain);
  }

  pub fn rows(&self) -> &[Domain] {
    &self.rows
  }

  pub fn retain<F>(&mut self, f: F)
    where F: FnMut(&Domain) -> bool
  {
    self.rows.retain(f);
  }

  pub fn len(&self) -> usize {
    self.rows.len()
  }

  pub fn is_empty(&self) -> bool {
    self.rows.is_empty()
  }

  /// Dominios que pertenecen al hit dado, en orden de tabla.
  pub fn for_hit(&self, hit_id: u64) -> Vec<&Domain> {
    self.rows.iter().filter(|d| d.hit_id == hit_id).collect()
  }
}

/// Invariante referencial comprobable: toda fila de `domains` referencia un
/// `hit_id` existente en `hits`. Una violación indica un bug del
/// normalizador o de un filtro y detiene la corrida.
pub fn verify_integrity(hits: &HitTable, domains: &DomainTable) -> Result<(), DomainError> {
  let ids = hits.ids();
  for domain in domains.rows() {
    if !ids.contains(&domain.hit_id) {
      return Err(DomainError::ReferentialError(format!("el dominio {} referencia un hit inexistente {}",
                                                       domain.domain_id, domain.hit_id)));
    }
  }
  Ok(())
}
