// Archivo: search_http.rs
// Propósito: implementación HTTP del contrato `SearchService` contra el
// servicio remoto de búsqueda por perfil. Mapea el estado HTTP a la
// taxonomía de errores del cliente: 4xx → Service (no reintenable),
// 5xx y fallos de red → Transient (reintenable por el motor).
use async_trait::async_trait;
use chrono::Utc;
use search::{JobStatus, Query, RawNestedResult, SearchError, SearchJob, SearchService};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

#[derive(Serialize)]
struct SubmitQuery<'a> {
    id: &'a str,
    sequence: &'a str,
}

#[derive(Serialize)]
struct SubmitBody<'a> {
    sequences: Vec<SubmitQuery<'a>>,
    databases: &'a [String],
}

#[derive(Deserialize)]
struct SubmitReply {
    job_id: String,
}

#[derive(Deserialize)]
struct StatusReply {
    status: String,
}

/// Clasifica la respuesta HTTP según la taxonomía de errores del cliente.
async fn check(result: Result<reqwest::Response, reqwest::Error>) -> Result<reqwest::Response, SearchError> {
    match result {
        Err(e) => Err(SearchError::Transient(format!("fallo de red: {}", e))),
        Ok(response) if response.status().is_server_error() => {
            Err(SearchError::Transient(format!("estado HTTP {}", response.status())))
        }
        Ok(response) if response.status().is_client_error() => {
            Err(SearchError::Service(format!("estado HTTP {}", response.status())))
        }
        Ok(response) => Ok(response),
    }
}

/// Cliente HTTP del servicio de búsqueda remoto.
pub struct HttpSearchService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSearchService {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SearchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SearchError::Validation(format!("no se pudo construir el cliente HTTP: {}", e)))?;
        Ok(Self { client, base_url: base_url.trim_end_matches('/').to_string() })
    }
}

#[async_trait]
impl SearchService for HttpSearchService {
    async fn submit(&self, queries: &[Query], target_databases: &[String]) -> Result<SearchJob, SearchError> {
        let body = SubmitBody { sequences: queries.iter()
                                                  .map(|q| SubmitQuery { id: q.id(), sequence: q.sequence() })
                                                  .collect(),
                                databases: target_databases };
        let url = format!("{}/search", self.base_url);
        let response = check(self.client.post(&url).json(&body).send().await).await?;
        let reply: SubmitReply = response.json()
                                         .await
                                         .map_err(|e| SearchError::Decode(e.to_string()))?;
        tracing::info!(remote_id = %reply.job_id, "job creado en el servicio remoto");
        Ok(SearchJob { id: Uuid::new_v4(),
                       remote_id: reply.job_id,
                       query_ids: queries.iter().map(|q| q.id().to_string()).collect(),
                       target_databases: target_databases.to_vec(),
                       submission_time: Utc::now(),
                       status: JobStatus::Pending })
    }

    async fn poll(&self, job: &SearchJob) -> Result<JobStatus, SearchError> {
        let url = format!("{}/jobs/{}/status", self.base_url, job.remote_id);
        let response = check(self.client.get(&url).send().await).await?;
        let reply: StatusReply = response.json()
                                         .await
                                         .map_err(|e| SearchError::Decode(e.to_string()))?;
        match reply.status.to_ascii_lowercase().as_str() {
            "pending" | "queued" => Ok(JobStatus::Pending),
            "running" => Ok(JobStatus::Running),
            "complete" | "done" => Ok(JobStatus::Complete),
            "failed" | "error" => Ok(JobStatus::Failed),
            other => Err(SearchError::Decode(format!("estado desconocido del servicio: '{}'", other))),
        }
    }

    async fn fetch_results(&self, job: &SearchJob) -> Result<RawNestedResult, SearchError> {
        if job.status != JobStatus::Complete {
            return Err(SearchError::NotReady(job.id));
        }
        let url = format!("{}/jobs/{}/results", self.base_url, job.remote_id);
        let response = check(self.client.get(&url).send().await).await?;
        response.json::<RawNestedResult>()
                .await
                .map_err(|e| SearchError::Decode(e.to_string()))
    }

    fn supports_batching(&self) -> bool {
        true
    }
}
