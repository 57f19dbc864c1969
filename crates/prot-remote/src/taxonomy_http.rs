// Archivo: taxonomy_http.rs
// Propósito: implementación HTTP de `TaxonomySource` con límite de tasa por
// semáforo y reintento interno con backoff para fallos transitorios (red,
// 5xx), igual que el bucle de sondeo del cliente de búsqueda. Un 404 es
// `UnknownTaxon`.
use async_trait::async_trait;
use prot_domain::{DomainError, TaxonLineage, TaxonomySource};
use reqwest::StatusCode;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

#[derive(Deserialize)]
struct RankEntry {
    rank: String,
    name: String,
}

const TRANSIENT_RETRIES: u32 = 3;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(250);

/// Cliente HTTP de la fuente taxonómica remota.
///
/// `max_in_flight` acota las búsquedas concurrentes contra la fuente; la
/// caché single-flight del resolver ya colapsa los ids duplicados, así que
/// el límite actúa sobre ids distintos.
pub struct HttpTaxonomySource {
    client: reqwest::Client,
    base_url: String,
    limiter: Arc<Semaphore>,
}

impl HttpTaxonomySource {
    pub fn new(base_url: &str, timeout: Duration, max_in_flight: usize) -> Result<Self, DomainError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DomainError::ExternalError(format!("no se pudo construir el cliente HTTP: {}", e)))?;
        Ok(Self { client,
                  base_url: base_url.trim_end_matches('/').to_string(),
                  limiter: Arc::new(Semaphore::new(max_in_flight.max(1))) })
    }

    async fn lookup_once(&self, taxon_id: u32) -> Result<TaxonLineage, LookupFailure> {
        let url = format!("{}/taxonomy/{}", self.base_url, taxon_id);
        let response = self.client
                           .get(&url)
                           .send()
                           .await
                           .map_err(|e| LookupFailure::Transient(format!("fallo de red: {}", e)))?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(LookupFailure::Fatal(DomainError::UnknownTaxon(taxon_id))),
            status if status.is_server_error() => {
                Err(LookupFailure::Transient(format!("estado HTTP {}", status)))
            }
            status if !status.is_success() => {
                Err(LookupFailure::Fatal(DomainError::ExternalError(format!("estado HTTP {} al consultar el taxón {}",
                                                                            status, taxon_id))))
            }
            _ => {
                let entries: Vec<RankEntry> =
                    response.json()
                            .await
                            .map_err(|e| LookupFailure::Fatal(DomainError::ExternalError(format!("error decodificando linaje: {}",
                                                                                                 e))))?;
                Ok(TaxonLineage::from_ranks(entries.into_iter().map(|e| (e.rank, e.name))))
            }
        }
    }
}

enum LookupFailure {
    Transient(String),
    Fatal(DomainError),
}

#[async_trait]
impl TaxonomySource for HttpTaxonomySource {
    async fn lookup(&self, taxon_id: u32) -> Result<TaxonLineage, DomainError> {
        let _permit = self.limiter
                          .acquire()
                          .await
                          .map_err(|e| DomainError::ExternalError(format!("semáforo cerrado: {}", e)))?;
        let mut delay = RETRY_BASE_DELAY;
        let mut attempt = 0u32;
        loop {
            match self.lookup_once(taxon_id).await {
                Ok(lineage) => return Ok(lineage),
                Err(LookupFailure::Fatal(e)) => return Err(e),
                Err(LookupFailure::Transient(reason)) => {
                    attempt += 1;
                    if attempt > TRANSIENT_RETRIES {
                        return Err(DomainError::ExternalError(format!("fallo transitorio persistente consultando el taxón {}: {}",
                                                                      taxon_id, reason)));
                    }
                    tracing::warn!(taxon_id, intento = attempt, %reason, "reintentando búsqueda taxonómica");
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
            }
        }
    }
}
