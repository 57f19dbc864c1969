use thiserror::Error;

// Errores comunes de la capa de orquestación del pipeline.
//
// Este enum centraliza los errores que pueden ocurrir al orquestar la
// búsqueda, el enriquecimiento y la curación: errores del cliente de
// búsqueda (`SearchError`), errores del dominio (`DomainError`),
// validaciones y errores de serialización.
#[derive(Error, Debug)]
pub enum PipelineError {
  /// Errores originados por el cliente de búsqueda remota.
  #[error("Error de búsqueda: {0}")]
  Search(#[from] search::SearchError),

  /// Errores originados por operaciones del dominio.
  #[error("Error de dominio: {0}")]
  Domain(#[from] prot_domain::DomainError),

  /// Errores de serializacion/deserializacion JSON.
  #[error("Error de serializacion: {0}")]
  Serialization(#[from] serde_json::Error),

  /// Errores de validacion local del pipeline.
  #[error("Error de validacion: {0}")]
  Validation(String),

  /// Error generico: captura otros tipos de errores no tipados.
  #[error("Otro error: {0}")]
  Other(String),
}
