// Archivo: memo.rs
// Propósito: memoización direccionada por contenido del cálculo de
// propiedades: un perfil por secuencia única, sin recomputación entre hits
// duplicados.
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use prot_domain::{DomainError, PhysicochemicalProfile, PropertyCalculator};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Envoltura memoizante sobre cualquier `PropertyCalculator`.
///
/// La clave de la caché es la secuencia misma (direccionamiento por
/// contenido, no por hit). Los errores no se cachean: una secuencia
/// inválida falla en cada intento sin envenenar la caché.
pub struct MemoizedPropertyCalculator {
    inner: Arc<dyn PropertyCalculator>,
    cache: DashMap<String, Arc<PhysicochemicalProfile>>,
    computations: AtomicUsize,
}

impl MemoizedPropertyCalculator {
    pub fn new(inner: Arc<dyn PropertyCalculator>) -> Self {
        Self { inner, cache: DashMap::new(), computations: AtomicUsize::new(0) }
    }

    /// Calcula (o recupera de la caché) el perfil de la secuencia.
    pub fn compute(&self, sequence: &str) -> Result<Arc<PhysicochemicalProfile>, DomainError> {
        match self.cache.entry(sequence.to_string()) {
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(entry) => {
                self.computations.fetch_add(1, Ordering::SeqCst);
                let profile = Arc::new(self.inner.compute(sequence)?);
                entry.insert(profile.clone());
                Ok(profile)
            }
        }
    }

    /// Cantidad de cómputos reales efectuados (no de consultas).
    pub fn computation_count(&self) -> usize {
        self.computations.load(Ordering::SeqCst)
    }

    pub fn index_names(&self) -> Vec<String> {
        self.inner.index_names()
    }
}
