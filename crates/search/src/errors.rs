// Archivo: errors.rs
// Propósito: definir la taxonomía de errores del cliente de búsqueda y el
// alias Result<T> usado por las APIs del crate.
use thiserror::Error;
use uuid::Uuid;

/// Errores del cliente de búsqueda remota.
///
/// - `NotReady`: los resultados aún no están disponibles (recuperable).
/// - `Timeout`: se agotó la espera máxima del sondeo.
/// - `Transient`: fallo reintenable del servicio (red, 5xx).
/// - `Service`: rechazo no reintenable del servicio (4xx).
/// - `Validation`: entrada inválida antes de tocar la red.
/// - `Decode`: la respuesta remota no se pudo interpretar.
#[derive(Error, Debug)]
pub enum SearchError {
  /// El job todavía no está completo; reintentar el sondeo más tarde.
  #[error("Resultados no disponibles: el job {0} no está completo")]
  NotReady(Uuid),
  /// Se superó la espera máxima configurada para el sondeo.
  #[error("Tiempo de espera agotado tras {0:?}")]
  Timeout(std::time::Duration),
  /// Fallo transitorio del servicio remoto. Se reintenta con backoff.
  #[error("Error transitorio del servicio: {0}")]
  Transient(String),
  /// Rechazo definitivo del servicio remoto. No se reintenta.
  #[error("Error del servicio: {0}")]
  Service(String),
  /// Error de validación de la entrada.
  #[error("Error de validación: {0}")]
  Validation(String),
  /// Error al decodificar la respuesta del servicio.
  #[error("Error de decodificación: {0}")]
  Decode(String),
}

impl From<serde_json::Error> for SearchError {
  fn from(e: serde_json::Error) -> Self {
    Self::Decode(e.to_string())
  }
}

/// Alias de resultado usado por las APIs del crate.
pub type Result<T> = std::result::Result<T, SearchError>;
