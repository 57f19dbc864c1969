// sequence.rs
use crate::DomainError;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Fuente de secuencias completas por accesión.
///
/// `Ok(None)` significa que la fuente no conoce la accesión: la ausencia se
/// registra y nunca se sustituye por un placeholder. Los errores de
/// transporte se devuelven como `Err` y el enriquecimiento los aísla por
/// fila.
#[async_trait]
pub trait SequenceSource: Send + Sync {
  async fn fetch(&self, accession: &str) -> Result<Option<String>, DomainError>;
}

/// Fuente de secuencias en memoria para pruebas y demos, con inyección de
/// fallos por accesión y conteo de llamadas.
#[derive(Debug, Default)]
pub struct InMemorySequenceSource {
  sequences: HashMap<String, String>,
  failing: HashSet<String>,
  calls: AtomicUsize,
}

impl InMemorySequenceSource {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn from_entries<I>(entries: I) -> Self
    where I: IntoIterator<Item = (String, String)>
  {
    Self { sequences: entries.into_iter().collect(),
           failing: HashSet::new(),
           calls: AtomicUsize::new(0) }
  }

  pub fn insert(&mut self, accession: &str, sequence: &str) {
    self.sequences.insert(accession.to_string(), sequence.to_string());
  }

  /// Marca una accesión para que su consulta falle con error externo.
  pub fn with_failure(mut self, accession: &str) -> Self {
    self.failing.insert(accession.to_string());
    self
  }

  pub fn fetch_calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl SequenceSource for InMemorySequenceSource {
  async fn fetch(&self, accession: &str) -> Result<Option<String>, DomainError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    if self.failing.contains(accession) {
      return Err(DomainError::ExternalError(format!("fallo inyectado al consultar {}", accession)));
    }
    Ok(self.sequences.get(accession).cloned())
  }
}
