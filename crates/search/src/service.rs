// Archivo: service.rs
// Propósito: definir el trait `SearchService`, el contrato que deben
// implementar los servicios de búsqueda (HTTP, in-memory, etc.). El motor
// `SearchEngine` orquesta el sondeo sobre este contrato.
use crate::domain::{JobStatus, Query, RawNestedResult, SearchJob};
use crate::errors::Result;
use async_trait::async_trait;

/// Contrato mínimo de un servicio de búsqueda por perfil.
///
/// El servicio es remoto y de latencia no especificada: `submit` es
/// fire-and-forget, el estado del job sólo avanza mediante `poll`, y
/// `fetch_results` falla con `NotReady` mientras el job no esté completo.
#[async_trait]
pub trait SearchService: Send + Sync {
    /// Envía una o más consultas contra una o más bases de datos objetivo y
    /// devuelve el handle del job creado.
    async fn submit(&self, queries: &[Query], target_databases: &[String]) -> Result<SearchJob>;

    /// Consulta el estado actual del job en el servicio remoto.
    async fn poll(&self, job: &SearchJob) -> Result<JobStatus>;

    /// Recupera el resultado anidado de un job completo. Debe fallar con
    /// `SearchError::NotReady` si el estado no es `Complete`.
    async fn fetch_results(&self, job: &SearchJob) -> Result<RawNestedResult>;

    /// Indica si el servicio admite varias consultas y bases en un solo job.
    /// Cuando es `false`, el motor hace fan-out de un job por par
    /// (consulta, base) y los resultados se fusionan aguas abajo.
    fn supports_batching(&self) -> bool {
        true
    }
}
