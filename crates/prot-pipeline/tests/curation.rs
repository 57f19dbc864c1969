use prot_domain::{normalize, verify_integrity};
use prot_pipeline::{deduplicate, filter_by_evalue};
use search::{RawDomain, RawHit, RawNestedResult, RawQueryResult};

fn raw_domain(evalue: f64, start: u32, end: u32) -> RawDomain {
  RawDomain { independent_evalue: evalue, score: 12.0, align_start: start, align_end: end }
}

fn raw_hit(accession: &str, evalue: f64, taxon_id: Option<u32>, domains: Vec<RawDomain>) -> RawHit {
  RawHit { target_accession: accession.to_string(),
           full_sequence_evalue: evalue,
           full_sequence_score: 60.0,
           taxon_id,
           description: None,
           domains }
}

fn one_query(hits: Vec<RawHit>) -> RawNestedResult {
  RawNestedResult { queries: vec![RawQueryResult { query_id: "q1".into(), hits }] }
}

#[test]
fn non_cascading_filter_flags_hit_left_without_domains() {
  // hit significativo a nivel de secuencia completa; todos sus dominios
  // quedan por encima del umbral
  let raw = one_query(vec![raw_hit("ACC1", 0.0001, Some(562), vec![raw_domain(0.01, 1, 50), raw_domain(0.01, 60, 90)])]);
  let (hits, domains) = normalize(&raw).unwrap();
  let hit_id = hits.rows()[0].hit_id;

  let outcome = filter_by_evalue(hits, domains, 0.001).unwrap();
  assert_eq!(outcome.hits.len(), 1);
  assert!(outcome.domains.is_empty());
  assert_eq!(outcome.red_flags, vec![hit_id]);
}

#[test]
fn evalue_filter_scenario_two_hits_four_domains() {
  let raw = one_query(vec![raw_hit("ACC1", 0.0001, None, vec![raw_domain(0.0005, 1, 40), raw_domain(0.2, 50, 80)]),
                           raw_hit("ACC2", 0.1, None, vec![raw_domain(0.9, 1, 30), raw_domain(0.95, 35, 60)])]);
  let (hits, domains) = normalize(&raw).unwrap();

  let outcome = filter_by_evalue(hits, domains, 0.001).unwrap();
  assert_eq!(outcome.hits.len(), 1);
  assert_eq!(outcome.hits.rows()[0].target_accession, "ACC1");
  // de los dos dominios del hit retenido sobrevive exactamente uno
  assert_eq!(outcome.domains.len(), 1);
  assert!((outcome.domains.rows()[0].domain_evalue - 0.0005).abs() < 1e-12);
  // el hit retenido conserva un dominio significativo: no hay desacuerdo
  assert!(outcome.red_flags.is_empty());
  verify_integrity(&outcome.hits, &outcome.domains).unwrap();
}

#[test]
fn hit_without_domains_passes_filter_unflagged() {
  let raw = one_query(vec![raw_hit("ACC1", 1e-8, None, vec![])]);
  let (hits, domains) = normalize(&raw).unwrap();
  let outcome = filter_by_evalue(hits, domains, 0.001).unwrap();
  assert_eq!(outcome.hits.len(), 1);
  // sin dominios crudos no hay desacuerdo que reportar
  assert!(outcome.red_flags.is_empty());
}

#[test]
fn single_residue_domain_survives_normalization_and_filter() {
  let raw = one_query(vec![raw_hit("ACC1", 1e-8, None, vec![raw_domain(1e-6, 17, 17)])]);
  let (hits, domains) = normalize(&raw).unwrap();
  let outcome = filter_by_evalue(hits, domains, 0.001).unwrap();
  assert_eq!(outcome.domains.len(), 1);
  assert_eq!(outcome.domains.rows()[0].align_start, 17);
  assert_eq!(outcome.domains.rows()[0].align_end, 17);
}

#[test]
fn deduplicate_keeps_first_occurrence_and_drops_duplicate_domains() {
  let raw = one_query(vec![raw_hit("ACC1", 1e-9, Some(562), vec![raw_domain(1e-8, 1, 40)]),
                           raw_hit("ACC2", 1e-7, Some(562), vec![raw_domain(1e-6, 1, 40)]),
                           raw_hit("ACC3", 1e-5, Some(9606), vec![])]);
  let (mut hits, domains) = normalize(&raw).unwrap();
  // ACC1 y ACC2 comparten secuencia y taxón: misma clave de deduplicación
  for hit in hits.rows_mut() {
    hit.full_sequence = Some(match hit.target_accession.as_str() {
                               "ACC3" => "GAVLI".to_string(),
                               _ => "MKVLT".to_string(),
                             });
  }
  let first_id = hits.rows()[0].hit_id;
  let duplicate_id = hits.rows()[1].hit_id;

  let outcome = deduplicate(hits, domains).unwrap();
  assert_eq!(outcome.hits.len(), 2);
  assert_eq!(outcome.hits.rows()[0].hit_id, first_id);
  assert_eq!(outcome.removed_duplicates, vec![duplicate_id]);
  // los dominios del duplicado se fueron con él
  assert!(outcome.domains.for_hit(duplicate_id).is_empty());
  assert_eq!(outcome.domains.for_hit(first_id).len(), 1);
  verify_integrity(&outcome.hits, &outcome.domains).unwrap();
}

#[test]
fn deduplicate_drops_rows_without_sequence_explicitly() {
  let raw = one_query(vec![raw_hit("ACC1", 1e-9, Some(562), vec![]), raw_hit("ACC2", 1e-7, Some(562), vec![])]);
  let (mut hits, domains) = normalize(&raw).unwrap();
  hits.rows_mut()[0].full_sequence = Some("MKVLT".to_string());
  let missing_id = hits.rows()[1].hit_id;

  let outcome = deduplicate(hits, domains).unwrap();
  assert_eq!(outcome.hits.len(), 1);
  assert_eq!(outcome.dropped_missing_sequence, vec![missing_id]);
  assert!(outcome.removed_duplicates.is_empty());
}

#[test]
fn filter_rejects_invalid_threshold() {
  let raw = one_query(vec![raw_hit("ACC1", 1e-9, None, vec![])]);
  let (hits, domains) = normalize(&raw).unwrap();
  assert!(filter_by_evalue(hits, domains, -1.0).is_err());
}
