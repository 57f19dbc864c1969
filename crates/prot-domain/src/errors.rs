// error.rs
use search::SearchError;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum DomainError {
  #[error("Error de validación: {0}")]
  ValidationError(String),
  #[error("Error referencial: {0}")]
  ReferentialError(String),
  #[error("Secuencia inválida: {0}")]
  InvalidSequence(String),
  #[error("Taxón desconocido: {0}")]
  UnknownTaxon(u32),
  #[error("No encontrado: {0}")]
  NotFound(String),
  #[error("Error externo: {0}")]
  ExternalError(String),
  #[error("Error de serialización: {0}")]
  SerializationError(String),
}

impl From<SearchError> for DomainError {
  fn from(e: SearchError) -> Self {
    Self::ExternalError(e.to_string())
  }
}

impl From<serde_json::Error> for DomainError {
  fn from(e: serde_json::Error) -> Self {
    Self::SerializationError(e.to_string())
  }
}
