// Archivo: domain.rs
// Propósito: tipos de dominio del cliente de búsqueda: consultas validadas,
// jobs con su máquina de estados y los DTOs crudos del resultado anidado
// (query → hit → dominio) tal como los entrega el servicio remoto.
use crate::errors::{Result, SearchError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Consulta proteica inmutable una vez construida.
///
/// El identificador y la secuencia se validan en el constructor; los
/// metadatos (salida del parser de cabeceras) se adjuntan como valor JSON
/// opaco y el núcleo nunca los interpreta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
  id: String,
  sequence: String,
  metadata: serde_json::Value,
}

impl Query {
  pub fn new(id: &str, sequence: &str) -> Result<Self> {
    Self::with_metadata(id, sequence, serde_json::Value::Null)
  }

  pub fn with_metadata(id: &str, sequence: &str, metadata: serde_json::Value) -> Result<Self> {
    if id.trim().is_empty() {
      return Err(SearchError::Validation("el identificador de la consulta no puede estar vacío".to_string()));
    }
    let sequence = sequence.trim().to_uppercase();
    if sequence.is_empty() {
      return Err(SearchError::Validation("la secuencia de la consulta no puede estar vacía".to_string()));
    }
    if !sequence.chars().all(|c| c.is_ascii_alphabetic()) {
      return Err(SearchError::Validation(format!("la secuencia de '{}' contiene caracteres no alfabéticos", id)));
    }
    Ok(Self { id: id.trim().to_string(), sequence, metadata })
  }

  pub fn id(&self) -> &str {
    &self.id
  }

  pub fn sequence(&self) -> &str {
    &self.sequence
  }

  pub fn metadata(&self) -> &serde_json::Value {
    &self.metadata
  }
}

impl fmt::Display for Query {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Query(id: {}, residuos: {})", self.id, self.sequence.len())
  }
}

/// Colaborador externo que interpreta cabeceras de secuencia de texto libre.
///
/// El núcleo trata la salida como metadatos opacos adjuntos a la consulta;
/// el formato concreto (UniProt, NCBI, etc.) es responsabilidad del
/// implementador.
pub trait HeaderParser: Send + Sync {
  fn parse(&self, header: &str) -> serde_json::Value;
}

/// Estado de un job remoto. Transiciona únicamente vía sondeo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
  Pending,
  Running,
  Complete,
  Failed,
}

/// Job de búsqueda ya enviado al servicio remoto.
///
/// `id` es el identificador local del handle; `remote_id` es el asignado por
/// el servicio. El cliente no guarda más estado local que este registro.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchJob {
  pub id: Uuid,
  pub remote_id: String,
  pub query_ids: Vec<String>,
  pub target_databases: Vec<String>,
  pub submission_time: DateTime<Utc>,
  pub status: JobStatus,
}

/// Región alineada cruda dentro de un hit, con su e-value independiente.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDomain {
  pub independent_evalue: f64,
  pub score: f64,
  /// Coordenadas 1-based inclusivas sobre la secuencia objetivo.
  pub align_start: u32,
  pub align_end: u32,
}

/// Hit crudo: una secuencia objetivo emparejada para una consulta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawHit {
  pub target_accession: String,
  pub full_sequence_evalue: f64,
  pub full_sequence_score: f64,
  #[serde(default)]
  pub taxon_id: Option<u32>,
  #[serde(default)]
  pub description: Option<String>,
  /// Puede estar vacío: el servicio reportó el hit sin resolver fronteras
  /// de dominio.
  #[serde(default)]
  pub domains: Vec<RawDomain>,
}

/// Resultados crudos de una consulta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawQueryResult {
  pub query_id: String,
  #[serde(default)]
  pub hits: Vec<RawHit>,
}

/// Resultado anidado completo de un job, recorrible determinísticamente en
/// el orden query → hit → dominio.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawNestedResult {
  pub queries: Vec<RawQueryResult>,
}

impl RawNestedResult {
  /// Subconjunto del resultado restringido a los ids de consulta dados,
  /// preservando el orden original.
  pub fn filter_queries(&self, query_ids: &[String]) -> RawNestedResult {
    RawNestedResult { queries: self.queries
                                   .iter()
                                   .filter(|q| query_ids.contains(&q.query_id))
                                   .cloned()
                                   .collect() }
  }
}
