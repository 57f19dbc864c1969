// Archivo: engine.rs
// Propósito: implementar `SearchEngine`, el motor de sondeo sobre un
// `SearchService`. El motor decide fan-out vs. batching, aplica el esquema
// de backoff con espera máxima y contabiliza los reintentos transitorios.
//
// Nota: el bucle de sondeo es cancel-safe. Soltar el futuro (por ejemplo
// dentro de un `select!`) detiene el sondeo sin invalidar el handle del
// job: el caller conserva el `SearchJob` y puede reanudar o re-consultar.
use crate::domain::{JobStatus, Query, RawNestedResult, SearchJob};
use crate::errors::{Result, SearchError};
use crate::service::SearchService;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Configuración del bucle de sondeo.
///
/// El intervalo crece multiplicativamente desde `initial_interval` hasta
/// `max_interval`. `max_wait` es la espera total máxima por job antes de
/// rendirse con `Timeout`. `max_transient_retries` acota los fallos
/// transitorios consecutivos tolerados antes de propagar el último.
#[derive(Debug, Clone)]
pub struct PollConfig {
    pub initial_interval: Duration,
    pub backoff_factor: f64,
    pub max_interval: Duration,
    pub max_wait: Duration,
    pub max_transient_retries: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self { initial_interval: Duration::from_millis(500),
               backoff_factor: 2.0,
               max_interval: Duration::from_secs(10),
               max_wait: Duration::from_secs(300),
               max_transient_retries: 3 }
    }
}

impl PollConfig {
    fn next_interval(&self, current: Duration) -> Duration {
        let scaled = current.mul_f64(self.backoff_factor.max(1.0));
        scaled.min(self.max_interval)
    }
}

/// Motor de búsqueda genérico sobre un `SearchService` inyectado.
pub struct SearchEngine<S>
    where S: SearchService
{
    service: Arc<S>,
    config: PollConfig,
}

impl<S> SearchEngine<S> where S: SearchService
{
    pub fn new(service: Arc<S>, config: PollConfig) -> Self {
        Self { service, config }
    }

    pub fn service(&self) -> &Arc<S> {
        &self.service
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Envía las consultas contra las bases objetivo.
    ///
    /// Con un servicio que soporta batching se crea un único job; de lo
    /// contrario se hace fan-out de un job por par (consulta, base). El
    /// orden de los jobs devueltos es determinista: consultas en orden de
    /// entrada, bases en orden de entrada.
    pub async fn submit_all(&self, queries: &[Query], target_databases: &[String]) -> Result<Vec<SearchJob>> {
        if queries.is_empty() {
            return Err(SearchError::Validation("se requiere al menos una consulta".to_string()));
        }
        if target_databases.is_empty() {
            return Err(SearchError::Validation("se requiere al menos una base de datos objetivo".to_string()));
        }
        if self.service.supports_batching() {
            let job = self.service.submit(queries, target_databases).await?;
            tracing::info!(remote_id = %job.remote_id, queries = queries.len(), "job enviado (batch)");
            return Ok(vec![job]);
        }
        let mut jobs = Vec::with_capacity(queries.len() * target_databases.len());
        for query in queries {
            for db in target_databases {
                let job = self.service
                              .submit(std::slice::from_ref(query), std::slice::from_ref(db))
                              .await?;
                tracing::info!(remote_id = %job.remote_id, query = query.id(), db = %db, "job enviado (fan-out)");
                jobs.push(job);
            }
        }
        Ok(jobs)
    }

    /// Sondea el job con backoff hasta que complete o falle.
    ///
    /// Actualiza `job.status` en cada respuesta. Devuelve `Timeout` al
    /// agotar `max_wait`, `Service` si el job remoto terminó en `Failed`,
    /// y el último error transitorio al agotar `max_transient_retries`.
    pub async fn wait_for_completion(&self, job: &mut SearchJob) -> Result<()> {
        let started = Instant::now();
        let mut interval = self.config.initial_interval;
        let mut transient_failures = 0u32;
        loop {
            match self.service.poll(job).await {
                Ok(status) => {
                    transient_failures = 0;
                    job.status = status;
                    match status {
                        JobStatus::Complete => return Ok(()),
                        JobStatus::Failed => {
                            return Err(SearchError::Service(format!("el job remoto {} terminó en estado Failed",
                                                                    job.remote_id)))
                        }
                        JobStatus::Pending | JobStatus::Running => {}
                    }
                }
                Err(SearchError::Transient(reason)) => {
                    transient_failures += 1;
                    tracing::warn!(remote_id = %job.remote_id, intento = transient_failures, %reason,
                                   "fallo transitorio durante el sondeo");
                    if transient_failures > self.config.max_transient_retries {
                        return Err(SearchError::Transient(reason));
                    }
                }
                Err(other) => return Err(other),
            }
            let elapsed = started.elapsed();
            if elapsed >= self.config.max_wait {
                return Err(SearchError::Timeout(elapsed));
            }
            let remaining = self.config.max_wait - elapsed;
            tokio::time::sleep(interval.min(remaining)).await;
            interval = self.config.next_interval(interval);
        }
    }

    /// Recupera los resultados de un job ya completo.
    pub async fn fetch(&self, job: &SearchJob) -> Result<RawNestedResult> {
        if job.status != JobStatus::Complete {
            return Err(SearchError::NotReady(job.id));
        }
        self.service.fetch_results(job).await
    }

    /// Espera y recolecta los resultados de varios jobs con concurrencia
    /// acotada, preservando el orden de envío (necesario para que la
    /// normalización aguas abajo sea determinista).
    pub async fn collect_all(&self, jobs: Vec<SearchJob>, concurrency: usize) -> Result<Vec<RawNestedResult>> {
        stream::iter(jobs.into_iter().map(|mut job| async move {
                         self.wait_for_completion(&mut job).await?;
                         self.fetch(&job).await
                     }))
        .buffered(concurrency.max(1))
        .try_collect()
        .await
    }

    /// Envío, espera y recolección en una sola llamada.
    pub async fn run(&self,
                     queries: &[Query],
                     target_databases: &[String],
                     concurrency: usize)
                     -> Result<Vec<RawNestedResult>> {
        let jobs = self.submit_all(queries, target_databases).await?;
        self.collect_all(jobs, concurrency).await
    }
}
