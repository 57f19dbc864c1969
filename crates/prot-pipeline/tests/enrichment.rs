use async_trait::async_trait;
use prot_domain::{normalize, normalize_all, DomainError, InMemorySequenceSource, LocalTaxonomyIndex,
                  StandardPropertyCalculator, TaxonLineage, TaxonomySource};
use prot_pipeline::{build_export, deduplicate, filter_by_evalue, to_json_string, CachedTaxonomyResolver,
                    EnrichStage, EnrichmentOptions, EnrichmentPipeline, MemoizedPropertyCalculator, TaxonomyMode};
use search::{PollConfig, Query, RawDomain, RawHit, RawNestedResult, RawQueryResult, SearchEngine};
use search::stubs::InMemorySearchService;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Fuente taxonómica que cuenta las búsquedas subyacentes, con retardo
/// opcional para ensanchar la ventana de concurrencia.
struct CountingSource {
  inner: LocalTaxonomyIndex,
  calls: AtomicUsize,
  delay: Option<Duration>,
}

impl CountingSource {
  fn new(inner: LocalTaxonomyIndex) -> Self {
    Self { inner, calls: AtomicUsize::new(0), delay: None }
  }

  fn with_delay(mut self, delay: Duration) -> Self {
    self.delay = Some(delay);
    self
  }

  fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl TaxonomySource for CountingSource {
  async fn lookup(&self, taxon_id: u32) -> Result<TaxonLineage, DomainError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    if let Some(delay) = self.delay {
      tokio::time::sleep(delay).await;
    }
    self.inner.lookup(taxon_id).await
  }
}

fn coli_lineage() -> TaxonLineage {
  TaxonLineage::from_ranks(vec![("superkingdom".to_string(), "Bacteria".to_string()),
                                ("species".to_string(), "Escherichia coli".to_string())])
}

fn demo_taxonomy() -> LocalTaxonomyIndex {
  LocalTaxonomyIndex::from_entries(vec![(562, coli_lineage()),
                                        (9606,
                                         TaxonLineage::from_ranks(vec![("superkingdom".to_string(),
                                                                        "Eukaryota".to_string()),
                                                                       ("species".to_string(),
                                                                        "Homo sapiens".to_string())]))])
}

fn raw_hit(accession: &str, evalue: f64, taxon_id: Option<u32>) -> RawHit {
  RawHit { target_accession: accession.to_string(),
           full_sequence_evalue: evalue,
           full_sequence_score: 48.0,
           taxon_id,
           description: None,
           domains: vec![RawDomain { independent_evalue: evalue * 10.0, score: 20.0, align_start: 1, align_end: 30 }] }
}

fn pipeline_over(sequences: InMemorySequenceSource,
                 taxonomy: Arc<dyn TaxonomySource>)
                 -> (EnrichmentPipeline, Arc<CachedTaxonomyResolver>, Arc<MemoizedPropertyCalculator>) {
  let resolver = Arc::new(CachedTaxonomyResolver::new(taxonomy));
  let calculator = Arc::new(MemoizedPropertyCalculator::new(Arc::new(StandardPropertyCalculator::new())));
  let pipeline = EnrichmentPipeline::new(Arc::new(sequences),
                                         resolver.clone(),
                                         calculator.clone(),
                                         EnrichmentOptions::default());
  (pipeline, resolver, calculator)
}

#[tokio::test]
async fn partial_enrichment_isolates_single_accession_failure() {
  let raw = RawNestedResult { queries: vec![RawQueryResult { query_id: "q1".into(),
                                                             hits: vec![raw_hit("P00001", 1e-9, Some(562)),
                                                                        raw_hit("P00002", 1e-8, Some(562)),
                                                                        raw_hit("P00003", 1e-7, Some(9606))] }] };
  let (mut hits, _domains) = normalize(&raw).unwrap();

  let sequences = InMemorySequenceSource::from_entries(vec![("P00001".to_string(), "MKVLT".to_string()),
                                                            ("P00003".to_string(), "GAVLI".to_string())])
    .with_failure("P00002");
  let (pipeline, _resolver, _calc) = pipeline_over(sequences, Arc::new(demo_taxonomy()));

  let annotations = pipeline.enrich(&mut hits).await;

  // las dos accesiones sanas quedaron enriquecidas
  assert_eq!(hits.rows()[0].full_sequence.as_deref(), Some("MKVLT"));
  assert_eq!(hits.rows()[2].full_sequence.as_deref(), Some("GAVLI"));
  // la fila fallida queda ausente, sin placeholder
  assert!(hits.rows()[1].full_sequence.is_none());
  // y el fallo aparece nombrado en la lista acumulada
  let seq_failures: Vec<&str> = annotations.failures
                                           .iter()
                                           .filter(|f| f.stage == EnrichStage::SequenceFetch)
                                           .map(|f| f.key.as_str())
                                           .collect();
  assert_eq!(seq_failures, vec!["P00002"]);
  // perfiles calculados para las dos secuencias disponibles
  assert_eq!(annotations.profiles.len(), 2);
}

#[tokio::test]
async fn taxonomy_resolution_is_idempotent_with_single_lookup() {
  let source = Arc::new(CountingSource::new(demo_taxonomy()));
  let resolver = CachedTaxonomyResolver::new(source.clone());

  let first = resolver.resolve(562).await.unwrap();
  let second = resolver.resolve(562).await.unwrap();
  assert_eq!(first, second);
  assert_eq!(source.calls(), 1);
  assert!(resolver.is_cached(562));
}

#[tokio::test]
async fn concurrent_resolution_is_single_flight() {
  let source = Arc::new(CountingSource::new(demo_taxonomy()).with_delay(Duration::from_millis(20)));
  let resolver = Arc::new(CachedTaxonomyResolver::new(source.clone()));

  let (a, b, c) = tokio::join!(resolver.resolve(562), resolver.resolve(562), resolver.resolve(562));
  assert_eq!(a.unwrap(), coli_lineage());
  assert_eq!(b.unwrap(), coli_lineage());
  assert_eq!(c.unwrap(), coli_lineage());
  // tres callers concurrentes, una sola búsqueda subyacente
  assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn mode_selection_picks_the_configured_source() {
  // la fuente "remota" de esta prueba no conoce ningún taxón; la local sí
  let local = Arc::new(CountingSource::new(demo_taxonomy()));
  let remote = Arc::new(CountingSource::new(LocalTaxonomyIndex::new()));

  let resolver = CachedTaxonomyResolver::for_mode(TaxonomyMode::Local, local.clone(), remote.clone());
  assert!(resolver.resolve(562).await.is_ok());
  assert_eq!(local.calls(), 1);
  assert_eq!(remote.calls(), 0);

  let resolver = CachedTaxonomyResolver::for_mode(TaxonomyMode::Remote, local.clone(), remote.clone());
  assert!(resolver.resolve(562).await.is_err());
  assert_eq!(local.calls(), 1);
  assert_eq!(remote.calls(), 1);
}

#[tokio::test]
async fn unknown_taxon_is_recorded_not_fatal() {
  let raw = RawNestedResult { queries: vec![RawQueryResult { query_id: "q1".into(),
                                                             hits: vec![raw_hit("P00001", 1e-9, Some(777_777))] }] };
  let (mut hits, _domains) = normalize(&raw).unwrap();
  let sequences = InMemorySequenceSource::from_entries(vec![("P00001".to_string(), "MKVLT".to_string())]);
  let (pipeline, _resolver, _calc) = pipeline_over(sequences, Arc::new(demo_taxonomy()));

  let annotations = pipeline.enrich(&mut hits).await;
  assert!(annotations.lineages.is_empty());
  let tax_failures: Vec<&str> = annotations.failures
                                           .iter()
                                           .filter(|f| f.stage == EnrichStage::TaxonomyLookup)
                                           .map(|f| f.key.as_str())
                                           .collect();
  assert_eq!(tax_failures, vec!["777777"]);
  // la fila sigue enriquecida en lo demás
  assert_eq!(hits.rows()[0].full_sequence.as_deref(), Some("MKVLT"));
}

#[tokio::test]
async fn property_computation_is_content_addressed() {
  // dos hits distintos que comparten secuencia: un solo cómputo
  let raw = RawNestedResult { queries: vec![RawQueryResult { query_id: "q1".into(),
                                                             hits: vec![raw_hit("P00001", 1e-9, Some(562)),
                                                                        raw_hit("P00002", 1e-8, Some(9606))] }] };
  let (mut hits, _domains) = normalize(&raw).unwrap();
  let sequences = InMemorySequenceSource::from_entries(vec![("P00001".to_string(), "MKVLT".to_string()),
                                                            ("P00002".to_string(), "MKVLT".to_string())]);
  let (pipeline, _resolver, calculator) = pipeline_over(sequences, Arc::new(demo_taxonomy()));

  let annotations = pipeline.enrich(&mut hits).await;
  assert_eq!(annotations.profiles.len(), 1);
  assert_eq!(calculator.computation_count(), 1);
  // ambas filas se unen al mismo perfil por contenido
  assert!(annotations.profile_for(&hits.rows()[0]).is_some());
  assert!(annotations.profile_for(&hits.rows()[1]).is_some());
}

#[tokio::test]
async fn invalid_sequence_fails_only_its_row() {
  let raw = RawNestedResult { queries: vec![RawQueryResult { query_id: "q1".into(),
                                                             hits: vec![raw_hit("P00001", 1e-9, None),
                                                                        raw_hit("P00002", 1e-8, None)] }] };
  let (mut hits, _domains) = normalize(&raw).unwrap();
  // P00002 devuelve una secuencia con un residuo fuera del alfabeto
  let sequences = InMemorySequenceSource::from_entries(vec![("P00001".to_string(), "MKVLT".to_string()),
                                                            ("P00002".to_string(), "MKXLT".to_string())]);
  let (pipeline, _resolver, _calc) = pipeline_over(sequences, Arc::new(demo_taxonomy()));

  let annotations = pipeline.enrich(&mut hits).await;
  assert_eq!(annotations.profiles.len(), 1);
  let prop_failures: Vec<&str> = annotations.failures
                                            .iter()
                                            .filter(|f| f.stage == EnrichStage::PropertyComputation)
                                            .map(|f| f.key.as_str())
                                            .collect();
  assert_eq!(prop_failures, vec!["P00002"]);
}

#[tokio::test]
async fn full_pipeline_search_to_export() {
  let universe = RawNestedResult { queries: vec![RawQueryResult { query_id: "q1".into(),
                                                                  hits: vec![raw_hit("P00001", 1e-9, Some(562)),
                                                                             raw_hit("P00002", 0.5, Some(562))] },
                                                 RawQueryResult { query_id: "q2".into(),
                                                                  hits: vec![raw_hit("P00003", 1e-6, Some(9606))] }] };
  let service = Arc::new(InMemorySearchService::new(universe).without_batching());
  let config = PollConfig { initial_interval: Duration::from_millis(5),
                            backoff_factor: 2.0,
                            max_interval: Duration::from_millis(20),
                            max_wait: Duration::from_secs(5),
                            max_transient_retries: 3 };
  let engine = SearchEngine::new(service, config);

  let queries = vec![Query::new("q1", "MKVLTAAA").unwrap(), Query::new("q2", "GAVLIAAA").unwrap()];
  let dbs = vec!["pfam".to_string()];
  let raws = engine.run(&queries, &dbs, 4).await.expect("run");
  assert_eq!(raws.len(), 2);

  // fusion de jobs del fan-out como si fueran uno solo
  let (mut hits, domains) = normalize_all(&raws).unwrap();
  assert_eq!(hits.len(), 3);

  let sequences = InMemorySequenceSource::from_entries(vec![("P00001".to_string(), "MKVLT".to_string()),
                                                            ("P00002".to_string(), "MKVLT".to_string()),
                                                            ("P00003".to_string(), "GAVLI".to_string())]);
  let (pipeline, _resolver, _calc) = pipeline_over(sequences, Arc::new(demo_taxonomy()));
  let annotations = pipeline.enrich(&mut hits).await;
  assert!(annotations.failures.is_empty());

  let deduped = deduplicate(hits, domains).unwrap();
  // P00001 y P00002 comparten (secuencia, taxon): queda el primero
  assert_eq!(deduped.hits.len(), 2);

  let filtered = filter_by_evalue(deduped.hits, deduped.domains, 1e-3).unwrap();
  assert_eq!(filtered.hits.len(), 2);

  let export = build_export(&filtered.hits, &filtered.domains, &annotations);
  let hit_ids: Vec<u64> = export.hits.iter().map(|h| h.hit_id).collect();
  for domain in &export.domains {
    assert!(hit_ids.contains(&domain.hit_id), "clave foránea rota en el artefacto");
  }
  let json = to_json_string(&export).unwrap();
  assert!(json.contains("\"hits\""));
  assert!(json.contains("\"domains\""));
  assert!(json.contains("Escherichia coli"));
  assert!(json.contains("molecular_weight"));
}
