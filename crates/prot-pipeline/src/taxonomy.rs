// Archivo: taxonomy.rs
// Propósito: resolución taxonómica con caché por instancia y semántica
// single-flight: a lo sumo una búsqueda en vuelo por id; los callers
// concurrentes del mismo id esperan esa única resolución.
use dashmap::DashMap;
use prot_domain::{DomainError, TaxonLineage, TaxonomySource};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Modo de resolución elegido para una corrida de enriquecimiento. La
/// selección es por configuración al construir el resolver; mezclar modos
/// equivale a usar resolvers distintos sobre fuentes distintas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaxonomyMode {
    Local,
    Remote,
}

/// Resolver taxonómico con caché keyed por `taxon_id` sobre cualquier
/// `TaxonomySource` inyectada.
///
/// La resolución es idempotente: resolver dos veces el mismo id devuelve
/// linajes iguales y dispara a lo sumo una búsqueda subyacente. La caché es
/// el único estado mutable compartido del pipeline y admite lecturas
/// concurrentes.
pub struct CachedTaxonomyResolver {
    source: Arc<dyn TaxonomySource>,
    cache: DashMap<u32, Arc<OnceCell<TaxonLineage>>>,
}

impl CachedTaxonomyResolver {
    pub fn new(source: Arc<dyn TaxonomySource>) -> Self {
        Self { source, cache: DashMap::new() }
    }

    /// Construye el resolver eligiendo la fuente según el modo.
    pub fn for_mode(mode: TaxonomyMode,
                    local: Arc<dyn TaxonomySource>,
                    remote: Arc<dyn TaxonomySource>)
                    -> Self {
        match mode {
            TaxonomyMode::Local => Self::new(local),
            TaxonomyMode::Remote => Self::new(remote),
        }
    }

    /// Resuelve el linaje para un taxón, desde la caché si ya se resolvió.
    ///
    /// Los callers concurrentes de un id en vuelo esperan la resolución
    /// única en curso en lugar de emitir una segunda búsqueda. Los errores
    /// no se cachean: un id que falló puede reintentarse después.
    pub async fn resolve(&self, taxon_id: u32) -> Result<TaxonLineage, DomainError> {
        let cell = self.cache
                       .entry(taxon_id)
                       .or_insert_with(|| Arc::new(OnceCell::new()))
                       .clone();
        let lineage = cell.get_or_try_init(|| async {
                              tracing::debug!(taxon_id, "resolviendo linaje");
                              self.source.lookup(taxon_id).await
                          })
                          .await?;
        Ok(lineage.clone())
    }

    /// Verifica si un id ya está resuelto en la caché.
    pub fn is_cached(&self, taxon_id: u32) -> bool {
        self.cache
            .get(&taxon_id)
            .map(|cell| cell.initialized())
            .unwrap_or(false)
    }

    /// Cantidad de ids resueltos en la caché.
    pub fn cached_len(&self) -> usize {
        self.cache.iter().filter(|entry| entry.value().initialized()).count()
    }
}
