use prot_domain::{normalize_all, HitTable, InMemorySequenceSource, LocalTaxonomyIndex, SequenceSource,
                  StandardPropertyCalculator, TaxonLineage, TaxonomySource};
use prot_pipeline::{build_export, deduplicate, filter_by_evalue, write_json, CachedTaxonomyResolver,
                    EnrichmentOptions, EnrichmentPipeline, MemoizedPropertyCalculator};
use search::stubs::InMemorySearchService;
use search::{HeaderParser, PollConfig, Query, RawDomain, RawHit, RawNestedResult, RawQueryResult, SearchEngine,
             SearchService};
use std::env;
use std::error::Error;
use std::fs;
use std::io::{BufReader, BufWriter};
use std::sync::Arc;

/// Driver de demostración del pipeline completo: búsqueda remota →
/// normalización → enriquecimiento → curación → exportación.
///
/// Uso: `main-core [entrada.fasta] [umbral_evalue] [salida.json]`
///
/// Configuración por entorno (todas opcionales; sin ellas se usan los
/// servicios de demostración en memoria):
/// - PROTFLOW_SEARCH_URL, PROTFLOW_SEQUENCE_URL, PROTFLOW_TAXONOMY_URL
/// - PROTFLOW_TAXONOMY_TSV (índice local en disco)
/// - PROTFLOW_DATABASES (lista separada por comas; por defecto "pfam")
#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

    let args: Vec<String> = env::args().collect();
    let threshold: f64 = match args.get(2) {
        Some(raw) => raw.parse().map_err(|_| format!("umbral de e-value inválido: {}", raw))?,
        None => 1e-3,
    };
    let output_path = args.get(3).cloned().unwrap_or_else(|| "curated.json".to_string());

    let parser = SimpleHeaderParser;
    let queries = match args.get(1) {
        Some(path) => read_fasta_queries(path, &parser)?,
        None => {
            println!("Sin archivo de entrada; usando consultas de demostración");
            demo_queries(&parser)?
        }
    };
    println!("Consultas cargadas: {}", queries.len());

    let databases: Vec<String> = dotenvy::var("PROTFLOW_DATABASES")
        .unwrap_or_else(|_| "pfam".to_string())
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    // Servicio de búsqueda: HTTP si hay URL configurada, stub si no.
    let raws = match prot_remote::new_search_from_env() {
        Ok(service) => run_search(Arc::new(service), &queries, &databases).await?,
        Err(_) => {
            println!("PROTFLOW_SEARCH_URL no definida; usando servicio de demostración en memoria");
            let service = Arc::new(InMemorySearchService::new(demo_universe(&queries)));
            run_search(service, &queries, &databases).await?
        }
    };

    let (mut hits, domains) = normalize_all(&raws)?;
    println!("Tablas normalizadas: {} hits, {} dominios", hits.len(), domains.len());

    let sequences: Arc<dyn SequenceSource> = match prot_remote::new_sequence_from_env() {
        Ok(source) => Arc::new(source),
        Err(_) => Arc::new(demo_sequences(&hits)),
    };
    let taxonomy: Arc<dyn TaxonomySource> = match prot_remote::new_taxonomy_from_env() {
        Ok(source) => Arc::new(source),
        Err(_) => match dotenvy::var("PROTFLOW_TAXONOMY_TSV") {
            Ok(path) => {
                let file = fs::File::open(&path)?;
                Arc::new(LocalTaxonomyIndex::load_tsv(BufReader::new(file))?)
            }
            Err(_) => Arc::new(demo_taxonomy()),
        },
    };

    let resolver = Arc::new(CachedTaxonomyResolver::new(taxonomy));
    let calculator = Arc::new(MemoizedPropertyCalculator::new(Arc::new(StandardPropertyCalculator::new())));
    let pipeline = EnrichmentPipeline::new(sequences, resolver, calculator, EnrichmentOptions::default());
    let annotations = pipeline.enrich(&mut hits).await;
    if !annotations.failures.is_empty() {
        println!("Fallos de enriquecimiento ({}):", annotations.failures.len());
        for failure in &annotations.failures {
            println!("  [{}] {}: {}", failure.stage, failure.key, failure.message);
        }
    }

    let deduped = deduplicate(hits, domains)?;
    if !deduped.dropped_missing_sequence.is_empty() {
        println!("Hits descartados por falta de secuencia: {:?}", deduped.dropped_missing_sequence);
    }
    let filtered = filter_by_evalue(deduped.hits, deduped.domains, threshold)?;
    if !filtered.red_flags.is_empty() {
        println!("Atención: hits significativos sin ningún dominio significativo: {:?}", filtered.red_flags);
    }

    let export = build_export(&filtered.hits, &filtered.domains, &annotations);
    let file = fs::File::create(&output_path)?;
    write_json(BufWriter::new(file), &export)?;
    println!("Artefacto curado escrito en {}: {} hits, {} dominios",
             output_path, export.hits.len(), export.domains.len());
    Ok(())
}

async fn run_search<S>(service: Arc<S>,
                       queries: &[Query],
                       databases: &[String])
                       -> Result<Vec<RawNestedResult>, Box<dyn Error>>
    where S: SearchService
{
    let engine = SearchEngine::new(service, PollConfig::default());
    Ok(engine.run(queries, databases, 4).await?)
}

/// Parser de cabeceras ingenuo para el formato habitual
/// `>ACC descripción OS=Organismo OX=taxid`. Es un stand-in del
/// colaborador externo; el pipeline sólo adjunta su salida como metadatos.
struct SimpleHeaderParser;

impl HeaderParser for SimpleHeaderParser {
    fn parse(&self, header: &str) -> serde_json::Value {
        let header = header.trim_start_matches('>').trim();
        let accession = header.split_whitespace().next().unwrap_or("").to_string();
        let organism = header.split("OS=")
                             .nth(1)
                             .map(|rest| rest.split(" OX=").next().unwrap_or(rest).trim().to_string());
        let taxon = header.split("OX=")
                          .nth(1)
                          .and_then(|rest| rest.split_whitespace().next())
                          .and_then(|raw| raw.parse::<u32>().ok());
        let description = header.split_whitespace()
                                .skip(1)
                                .take_while(|tok| !tok.starts_with("OS=") && !tok.starts_with("OX="))
                                .collect::<Vec<_>>()
                                .join(" ");
        serde_json::json!({
            "accession": accession,
            "description": description,
            "organism": organism,
            "taxon_id": taxon,
        })
    }
}

/// Lee un archivo FASTA sencillo y construye las consultas validadas.
fn read_fasta_queries(path: &str, parser: &dyn HeaderParser) -> Result<Vec<Query>, Box<dyn Error>> {
    let content = fs::read_to_string(path)?;
    let mut queries = Vec::new();
    let mut header: Option<String> = None;
    let mut sequence = String::new();
    for line in content.lines() {
        if let Some(rest) = line.strip_prefix('>') {
            if let Some(prev) = header.take() {
                queries.push(query_from(&prev, &sequence, parser)?);
            }
            header = Some(rest.to_string());
            sequence.clear();
        } else {
            sequence.push_str(line.trim());
        }
    }
    if let Some(prev) = header {
        queries.push(query_from(&prev, &sequence, parser)?);
    }
    if queries.is_empty() {
        return Err(format!("el archivo {} no contiene secuencias", path).into());
    }
    Ok(queries)
}

fn query_from(header: &str, sequence: &str, parser: &dyn HeaderParser) -> Result<Query, Box<dyn Error>> {
    let metadata = parser.parse(header);
    let id = header.split_whitespace().next().unwrap_or(header);
    Ok(Query::with_metadata(id, sequence, metadata)?)
}

fn demo_queries(parser: &dyn HeaderParser) -> Result<Vec<Query>, Box<dyn Error>> {
    let entries = [(">DEMO_Q1 dominio de unión OS=Escherichia coli OX=562", "MKVLTAIALLPLAACSAQNETVVR"),
                   (">DEMO_Q2 proteína hipotética OS=Homo sapiens OX=9606", "GAVLIMFWYKRHDESTNQCP")];
    entries.iter()
           .map(|(header, sequence)| query_from(header, sequence, parser))
           .collect()
}

/// Universo de resultados del stub: dos hits por consulta, uno de ellos con
/// el desacuerdo significancia-de-secuencia vs. significancia-de-dominio.
fn demo_universe(queries: &[Query]) -> RawNestedResult {
    let taxa = [562u32, 9606u32];
    RawNestedResult { queries: queries.iter()
                                      .enumerate()
                                      .map(|(i, q)| RawQueryResult {
                                          query_id: q.id().to_string(),
                                          hits: vec![RawHit { target_accession: format!("DEMO_A{:03}", i * 2 + 1),
                                                              full_sequence_evalue: 1e-9,
                                                              full_sequence_score: 82.0,
                                                              taxon_id: Some(taxa[i % taxa.len()]),
                                                              description: Some("proteína conservada".to_string()),
                                                              domains: vec![RawDomain { independent_evalue: 1e-8,
                                                                                        score: 40.0,
                                                                                        align_start: 3,
                                                                                        align_end: 60 },
                                                                            RawDomain { independent_evalue: 0.4,
                                                                                        score: 9.0,
                                                                                        align_start: 70,
                                                                                        align_end: 90 }] },
                                                     RawHit { target_accession: format!("DEMO_A{:03}", i * 2 + 2),
                                                              full_sequence_evalue: 1e-4,
                                                              full_sequence_score: 35.0,
                                                              taxon_id: Some(taxa[(i + 1) % taxa.len()]),
                                                              description: None,
                                                              // significativo por secuencia completa pero con un
                                                              // único dominio no significativo
                                                              domains: vec![RawDomain { independent_evalue: 0.05,
                                                                                        score: 7.5,
                                                                                        align_start: 10,
                                                                                        align_end: 10 }] }],
                                      })
                                      .collect() }
}

fn demo_sequences(hits: &HitTable) -> InMemorySequenceSource {
    let pool = ["MKVLTAIALLPLAACSAQNETVVRGGDE", "GAVLIMFWYKRHDESTNQCPGAVLIMFW", "MSTNQCPKRHDEGAVLIWYFAAAR"];
    let mut source = InMemorySequenceSource::new();
    let mut seen = std::collections::HashSet::new();
    let mut next = 0usize;
    for hit in hits.rows() {
        if seen.insert(hit.target_accession.clone()) {
            source.insert(&hit.target_accession, pool[next % pool.len()]);
            next += 1;
        }
    }
    source
}

fn demo_taxonomy() -> LocalTaxonomyIndex {
    LocalTaxonomyIndex::from_entries(vec![(562,
                                           TaxonLineage::from_ranks(vec![("superkingdom".to_string(),
                                                                          "Bacteria".to_string()),
                                                                         ("phylum".to_string(),
                                                                          "Pseudomonadota".to_string()),
                                                                         ("species".to_string(),
                                                                          "Escherichia coli".to_string())])),
                                          (9606,
                                           TaxonLineage::from_ranks(vec![("superkingdom".to_string(),
                                                                          "Eukaryota".to_string()),
                                                                         ("phylum".to_string(),
                                                                          "Chordata".to_string()),
                                                                         ("species".to_string(),
                                                                          "Homo sapiens".to_string())]))])
}
