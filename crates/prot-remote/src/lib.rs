//! Implementaciones HTTP de los contratos remotos del pipeline.
//! Este crate expone los clientes `reqwest` para el servicio de búsqueda
//! (`SearchService`), la fuente de secuencias (`SequenceSource`) y la
//! fuente taxonómica (`TaxonomySource`), junto con constructores desde
//! variables de entorno. La implementación detallada está en los módulos
//! `*_http.rs`.

mod search_http;
mod sequence_http;
mod taxonomy_http;

pub use search_http::HttpSearchService;
pub use sequence_http::HttpSequenceSource;
pub use taxonomy_http::HttpTaxonomySource;

use prot_domain::DomainError;
use search::SearchError;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_TAXONOMY_IN_FLIGHT: usize = 4;

fn timeout_from_env() -> Duration {
    let secs = dotenvy::var("PROTFLOW_HTTP_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_TIMEOUT_SECS);
    Duration::from_secs(secs)
}

/// Construye el cliente del servicio de búsqueda desde `PROTFLOW_SEARCH_URL`.
pub fn new_search_from_env() -> Result<HttpSearchService, SearchError> {
    let base = dotenvy::var("PROTFLOW_SEARCH_URL")
        .map_err(|_| SearchError::Validation("PROTFLOW_SEARCH_URL no está definida".to_string()))?;
    HttpSearchService::new(&base, timeout_from_env())
}

/// Construye la fuente de secuencias desde `PROTFLOW_SEQUENCE_URL`.
pub fn new_sequence_from_env() -> Result<HttpSequenceSource, DomainError> {
    let base = dotenvy::var("PROTFLOW_SEQUENCE_URL")
        .map_err(|_| DomainError::NotFound("PROTFLOW_SEQUENCE_URL no está definida".to_string()))?;
    HttpSequenceSource::new(&base, timeout_from_env())
}

/// Construye la fuente taxonómica remota desde `PROTFLOW_TAXONOMY_URL`,
/// con el límite de búsquedas en vuelo de `PROTFLOW_TAXONOMY_IN_FLIGHT`.
pub fn new_taxonomy_from_env() -> Result<HttpTaxonomySource, DomainError> {
    let base = dotenvy::var("PROTFLOW_TAXONOMY_URL")
        .map_err(|_| DomainError::NotFound("PROTFLOW_TAXONOMY_URL no está definida".to_string()))?;
    let in_flight = dotenvy::var("PROTFLOW_TAXONOMY_IN_FLIGHT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_TAXONOMY_IN_FLIGHT);
    HttpTaxonomySource::new(&base, timeout_from_env(), in_flight)
}
