// Archivo: stubs.rs
// Propósito: implementación en memoria del `SearchService` para pruebas y
// wiring rápido. Permite guionar la secuencia de estados devuelta por cada
// sondeo e inyectar fallos transitorios, y cuenta las llamadas recibidas.
use crate::domain::{JobStatus, Query, RawNestedResult, SearchJob};
use crate::errors::{Result, SearchError};
use crate::service::SearchService;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// Estado interno por job guionado.
struct StubJobState {
    /// Cuántos sondeos se han atendido ya para este job.
    cursor: usize,
    /// Fallos transitorios pendientes de inyectar antes del próximo estado.
    transient_left: u32,
}

/// Servicio de búsqueda en memoria, guionado.
///
/// Cada job creado sigue el mismo guión de estados: el sondeo n devuelve
/// `script[n]` y el último estado se repite indefinidamente. Antes del
/// primer estado se inyectan `transient_before` fallos transitorios. El
/// resultado devuelto por `fetch_results` es el subconjunto del universo
/// configurado restringido a las consultas del job, de modo que el fan-out
/// y el batch producen los mismos datos agregados.
pub struct InMemorySearchService {
    batching: bool,
    script: Vec<JobStatus>,
    transient_before: u32,
    universe: RawNestedResult,
    state: Mutex<HashMap<String, StubJobState>>,
    submits: AtomicUsize,
    polls: AtomicUsize,
    fetches: AtomicUsize,
}

impl InMemorySearchService {
    /// Crea el stub con el guión por defecto Pending → Running → Complete.
    pub fn new(universe: RawNestedResult) -> Self {
        Self { batching: true,
               script: vec![JobStatus::Pending, JobStatus::Running, JobStatus::Complete],
               transient_before: 0,
               universe,
               state: Mutex::new(HashMap::new()),
               submits: AtomicUsize::new(0),
               polls: AtomicUsize::new(0),
               fetches: AtomicUsize::new(0) }
    }

    /// Reemplaza el guión de estados devuelto por los sondeos.
    pub fn with_script(mut self, script: Vec<JobStatus>) -> Self {
        self.script = script;
        self
    }

    /// Inyecta `n` fallos transitorios antes del primer estado de cada job.
    pub fn with_transient_failures(mut self, n: u32) -> Self {
        self.transient_before = n;
        self
    }

    /// Desactiva el batching: el motor hará fan-out por (consulta, base).
    pub fn without_batching(mut self) -> Self {
        self.batching = false;
        self
    }

    pub fn submit_count(&self) -> usize {
        self.submits.load(Ordering::SeqCst)
    }

    pub fn poll_count(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Helper para mapear `Mutex::lock()` en un `Result` del crate.
    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, StubJobState>>> {
        self.state
            .lock()
            .map_err(|e| SearchError::Service(format!("mutex poisoned: {:?}", e)))
    }

    /// Estado que corresponde al sondeo ya atendido número `cursor`.
    fn status_at(&self, cursor: usize) -> JobStatus {
        let idx = cursor.min(self.script.len().saturating_sub(1));
        self.script.get(idx).copied().unwrap_or(JobStatus::Failed)
    }
}

#[async_trait]
impl SearchService for InMemorySearchService {
    async fn submit(&self, queries: &[Query], target_databases: &[String]) -> Result<SearchJob> {
        self.submits.fetch_add(1, Ordering::SeqCst);
        let remote_id = format!("stub-{}", Uuid::new_v4());
        let mut state = self.lock()?;
        state.insert(remote_id.clone(),
                     StubJobState { cursor: 0, transient_left: self.transient_before });
        Ok(SearchJob { id: Uuid::new_v4(),
                       remote_id,
                       query_ids: queries.iter().map(|q| q.id().to_string()).collect(),
                       target_databases: target_databases.to_vec(),
                       submission_time: Utc::now(),
                       status: JobStatus::Pending })
    }

    async fn poll(&self, job: &SearchJob) -> Result<JobStatus> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.lock()?;
        let entry = state.get_mut(&job.remote_id)
                         .ok_or_else(|| SearchError::Service(format!("job desconocido: {}", job.remote_id)))?;
        if entry.transient_left > 0 {
            entry.transient_left -= 1;
            return Err(SearchError::Transient("fallo transitorio inyectado".to_string()));
        }
        let status = self.status_at(entry.cursor);
        entry.cursor += 1;
        Ok(status)
    }

    async fn fetch_results(&self, job: &SearchJob) -> Result<RawNestedResult> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let state = self.lock()?;
        let entry = state.get(&job.remote_id)
                         .ok_or_else(|| SearchError::Service(format!("job desconocido: {}", job.remote_id)))?;
        let reached_complete = entry.cursor > 0 && self.status_at(entry.cursor - 1) == JobStatus::Complete;
        if !reached_complete {
            return Err(SearchError::NotReady(job.id));
        }
        Ok(self.universe.filter_queries(&job.query_ids))
    }

    fn supports_batching(&self) -> bool {
        self.batching
    }
}
