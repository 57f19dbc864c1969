// lineage.rs
use crate::DomainError;
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::io::BufRead;

/// Linaje taxonómico: cadena ordenada de rangos de amplio a específico
/// (por ejemplo superkingdom → phylum → ... → species).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonLineage {
  ranks: IndexMap<String, String>,
}

impl TaxonLineage {
  pub fn new() -> Self {
    Self { ranks: IndexMap::new() }
  }

  /// Construye el linaje a partir de pares (rango, nombre) ya ordenados de
  /// amplio a específico.
  pub fn from_ranks<I>(ranks: I) -> Self
    where I: IntoIterator<Item = (String, String)>
  {
    Self { ranks: ranks.into_iter().collect() }
  }

  /// Añade un rango al final (el más específico hasta el momento).
  pub fn push_rank(&mut self, rank: &str, name: &str) {
    self.ranks.insert(rank.to_string(), name.to_string());
  }

  pub fn ranks(&self) -> &IndexMap<String, String> {
    &self.ranks
  }

  pub fn get(&self, rank: &str) -> Option<&str> {
    self.ranks.get(rank).map(|s| s.as_str())
  }

  pub fn len(&self) -> usize {
    self.ranks.len()
  }

  pub fn is_empty(&self) -> bool {
    self.ranks.is_empty()
  }
}

impl fmt::Display for TaxonLineage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let chain: Vec<&str> = self.ranks.values().map(|s| s.as_str()).collect();
    write!(f, "{}", chain.join(" > "))
  }
}

/// Fuente de linajes taxonómicos: dado un id de taxón devuelve su linaje o
/// `UnknownTaxon` si el id no existe en la fuente.
///
/// Hay dos familias de backend tras esta misma interfaz: el índice local
/// precargado (offline, rápido) y la consulta remota (red, limitada en
/// tasa). El modo se elige por corrida construyendo el resolver con la
/// fuente deseada; nada impide mezclar fuentes en resolvers distintos.
#[async_trait]
pub trait TaxonomySource: Send + Sync {
  async fn lookup(&self, taxon_id: u32) -> Result<TaxonLineage, DomainError>;
}

/// Índice taxonómico local: búsqueda offline sobre entradas precargadas.
/// Debe estar cargado antes de usarse; un id ausente es `UnknownTaxon`.
#[derive(Debug, Default)]
pub struct LocalTaxonomyIndex {
  entries: HashMap<u32, TaxonLineage>,
}

impl LocalTaxonomyIndex {
  pub fn new() -> Self {
    Self { entries: HashMap::new() }
  }

  pub fn from_entries<I>(entries: I) -> Self
    where I: IntoIterator<Item = (u32, TaxonLineage)>
  {
    Self { entries: entries.into_iter().collect() }
  }

  pub fn insert(&mut self, taxon_id: u32, lineage: TaxonLineage) {
    self.entries.insert(taxon_id, lineage);
  }

  /// Carga el índice desde un lector TSV con el formato
  /// `taxon_id<TAB>rango=nombre;rango=nombre;...` (una línea por taxón,
  /// líneas vacías y `#` ignoradas).
  pub fn load_tsv<R: BufRead>(reader: R) -> Result<Self, DomainError> {
    let mut index = Self::new();
    for (n, line) in reader.lines().enumerate() {
      let line = line.map_err(|e| DomainError::ExternalError(format!("error leyendo TSV: {}", e)))?;
      let line = line.trim();
      if line.is_empty() || line.starts_with('#') {
        continue;
      }
      let (id_field, ranks_field) = line.split_once('\t').ok_or_else(|| {
                                      DomainError::ValidationError(format!("línea {} sin separador TAB", n + 1))
                                    })?;
      let taxon_id: u32 = id_field.trim()
                                  .parse()
                                  .map_err(|_| DomainError::ValidationError(format!("id de taxón inválido en línea {}: '{}'",
                                                                                    n + 1, id_field)))?;
      let mut lineage = TaxonLineage::new();
      for pair in ranks_field.split(';').filter(|p| !p.trim().is_empty()) {
        let (rank, name) = pair.split_once('=').ok_or_else(|| {
                             DomainError::ValidationError(format!("par rango=nombre inválido en línea {}: '{}'",
                                                                  n + 1, pair))
                           })?;
        lineage.push_rank(rank.trim(), name.trim());
      }
      index.insert(taxon_id, lineage);
    }
    Ok(index)
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn contains(&self, taxon_id: u32) -> bool {
    self.entries.contains_key(&taxon_id)
  }
}

#[async_trait]
impl TaxonomySource for LocalTaxonomyIndex {
  async fn lookup(&self, taxon_id: u32) -> Result<TaxonLineage, DomainError> {
    self.entries
        .get(&taxon_id)
        .cloned()
        .ok_or(DomainError::UnknownTaxon(taxon_id))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn coli() -> TaxonLineage {
    TaxonLineage::from_ranks(vec![("superkingdom".to_string(), "Bacteria".to_string()),
                                  ("phylum".to_string(), "Pseudomonadota".to_string()),
                                  ("species".to_string(), "Escherichia coli".to_string())])
  }

  #[test]
  fn lineage_preserves_rank_order() {
    let lineage = coli();
    let ranks: Vec<&str> = lineage.ranks().keys().map(|s| s.as_str()).collect();
    assert_eq!(ranks, vec!["superkingdom", "phylum", "species"]);
    assert_eq!(lineage.get("species"), Some("Escherichia coli"));
  }

  #[tokio::test]
  async fn local_index_resolves_known_and_rejects_unknown() {
    let index = LocalTaxonomyIndex::from_entries(vec![(562, coli())]);
    let lineage = index.lookup(562).await.unwrap();
    assert_eq!(lineage, coli());
    let err = index.lookup(999_999).await.unwrap_err();
    match err {
      DomainError::UnknownTaxon(id) => assert_eq!(id, 999_999),
      other => panic!("expected UnknownTaxon, got {:?}", other),
    }
  }

  #[test]
  fn load_tsv_parses_entries_and_skips_comments() {
    let tsv = "# taxonomía de prueba\n562\tsuperkingdom=Bacteria;species=Escherichia coli\n\n9606\tsuperkingdom=Eukaryota;species=Homo sapiens\n";
    let index = LocalTaxonomyIndex::load_tsv(tsv.as_bytes()).unwrap();
    assert_eq!(index.len(), 2);
    assert!(index.contains(562));
    assert!(index.contains(9606));
  }

  #[test]
  fn load_tsv_rejects_malformed_lines() {
    assert!(LocalTaxonomyIndex::load_tsv("sin_tab".as_bytes()).is_err());
    assert!(LocalTaxonomyIndex::load_tsv("abc\tspecies=X".as_bytes()).is_err());
    assert!(LocalTaxonomyIndex::load_tsv("562\tspecies".as_bytes()).is_err());
  }
}
