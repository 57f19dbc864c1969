// properties.rs
use crate::DomainError;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;

/// Masas promedio de residuo (Expasy), en Da.
static RESIDUE_MASS: Lazy<HashMap<char, f64>> = Lazy::new(|| {
  HashMap::from([('A', 71.0788), ('R', 156.1875), ('N', 114.1038), ('D', 115.0886), ('C', 103.1388),
                 ('E', 129.1155), ('Q', 128.1307), ('G', 57.0519), ('H', 137.1411), ('I', 113.1594),
                 ('L', 113.1594), ('K', 128.1741), ('M', 131.1926), ('F', 147.1766), ('P', 97.1167),
                 ('S', 87.0782), ('T', 101.1051), ('W', 186.2132), ('Y', 163.1760), ('V', 99.1326)])
});

/// Escala de hidropatía de Kyte-Doolittle.
static HYDROPATHY: Lazy<HashMap<char, f64>> = Lazy::new(|| {
  HashMap::from([('A', 1.8), ('R', -4.5), ('N', -3.5), ('D', -3.5), ('C', 2.5), ('E', -3.5), ('Q', -3.5),
                 ('G', -0.4), ('H', -3.2), ('I', 4.5), ('L', 3.8), ('K', -3.9), ('M', 1.9), ('F', 2.8),
                 ('P', -1.6), ('S', -0.8), ('T', -0.7), ('W', -0.9), ('Y', -1.3), ('V', 4.2)])
});

const WATER_MASS: f64 = 18.01524;
const NTERM_PKA: f64 = 9.69;
const CTERM_PKA: f64 = 2.34;

/// pKa de cadenas laterales básicas y ácidas.
static BASIC_PKA: Lazy<HashMap<char, f64>> =
  Lazy::new(|| HashMap::from([('K', 10.53), ('R', 12.48), ('H', 6.0)]));
static ACIDIC_PKA: Lazy<HashMap<char, f64>> =
  Lazy::new(|| HashMap::from([('D', 3.65), ('E', 4.25), ('C', 8.18), ('Y', 10.07)]));

/// Hash de contenido (sha-256 hex) de una secuencia. Las propiedades se
/// direccionan por contenido: dos hits con la misma secuencia comparten
/// perfil.
pub fn sequence_hash(sequence: &str) -> String {
  let mut hasher = Sha256::new();
  hasher.update(sequence.as_bytes());
  format!("{:x}", hasher.finalize())
}

/// Perfil fisicoquímico de una secuencia: índices nombrados con su valor,
/// más el hash de contenido de la secuencia de la que se calculó.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicochemicalProfile {
  sequence_hash: String,
  values: IndexMap<String, f64>,
}

impl PhysicochemicalProfile {
  pub fn new(sequence_hash: String, values: IndexMap<String, f64>) -> Self {
    Self { sequence_hash, values }
  }

  pub fn sequence_hash(&self) -> &str {
    &self.sequence_hash
  }

  pub fn values(&self) -> &IndexMap<String, f64> {
    &self.values
  }

  pub fn get(&self, index_name: &str) -> Option<f64> {
    self.values.get(index_name).copied()
  }
}

impl fmt::Display for PhysicochemicalProfile {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "PhysicochemicalProfile(hash: {}.., índices: {})",
           &self.sequence_hash[..8.min(self.sequence_hash.len())], self.values.len())
  }
}

/// Estrategia de cálculo de índices fisicoquímicos.
///
/// Función pura de la secuencia: determinista, sin red ni estado mutable
/// compartido. El conjunto concreto de índices es configuración del
/// implementador; el núcleo sólo garantiza un perfil por secuencia única.
pub trait PropertyCalculator: Send + Sync {
  /// Nombres de los índices que produce este calculador, en orden.
  fn index_names(&self) -> Vec<String>;

  /// Calcula el perfil. `InvalidSequence` si hay residuos fuera del
  /// alfabeto aceptado.
  fn compute(&self, sequence: &str) -> Result<PhysicochemicalProfile, DomainError>;
}

/// Calculador estándar sobre los 20 residuos canónicos (minúsculas
/// aceptadas): peso molecular promedio, GRAVY, aromaticidad y carga neta a
/// pH 7.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardPropertyCalculator;

impl StandardPropertyCalculator {
  pub fn new() -> Self {
    Self
  }

  fn validate(sequence: &str) -> Result<Vec<char>, DomainError> {
    let residues: Vec<char> = sequence.trim().chars().map(|c| c.to_ascii_uppercase()).collect();
    if residues.is_empty() {
      return Err(DomainError::InvalidSequence("secuencia vacía".to_string()));
    }
    for (i, residue) in residues.iter().enumerate() {
      if !RESIDUE_MASS.contains_key(residue) {
        return Err(DomainError::InvalidSequence(format!("residuo '{}' fuera del alfabeto en posición {}",
                                                        residue, i + 1)));
      }
    }
    Ok(residues)
  }

  fn molecular_weight(residues: &[char]) -> f64 {
    residues.iter().map(|r| RESIDUE_MASS[r]).sum::<f64>() + WATER_MASS
  }

  fn gravy(residues: &[char]) -> f64 {
    residues.iter().map(|r| HYDROPATHY[r]).sum::<f64>() / residues.len() as f64
  }

  fn aromaticity(residues: &[char]) -> f64 {
    let aromatic = residues.iter().filter(|r| matches!(**r, 'F' | 'W' | 'Y')).count();
    aromatic as f64 / residues.len() as f64
  }

  /// Carga neta por Henderson-Hasselbalch a pH 7, con los pKa estándar de
  /// cadenas laterales y extremos.
  fn net_charge_ph7(residues: &[char]) -> f64 {
    const PH: f64 = 7.0;
    let positive = |pka: f64| 1.0 / (1.0 + 10f64.powf(PH - pka));
    let negative = |pka: f64| -1.0 / (1.0 + 10f64.powf(pka - PH));
    let mut charge = positive(NTERM_PKA) + negative(CTERM_PKA);
    for residue in residues {
      if let Some(pka) = BASIC_PKA.get(residue) {
        charge += positive(*pka);
      } else if let Some(pka) = ACIDIC_PKA.get(residue) {
        charge += negative(*pka);
      }
    }
    charge
  }
}

impl PropertyCalculator for StandardPropertyCalculator {
  fn index_names(&self) -> Vec<String> {
    vec!["molecular_weight".to_string(),
         "gravy".to_string(),
         "aromaticity".to_string(),
         "net_charge_ph7".to_string()]
  }

  fn compute(&self, sequence: &str) -> Result<PhysicochemicalProfile, DomainError> {
    let residues = Self::validate(sequence)?;
    let normalized: String = residues.iter().collect();
    let mut values = IndexMap::new();
    values.insert("molecular_weight".to_string(), Self::molecular_weight(&residues));
    values.insert("gravy".to_string(), Self::gravy(&residues));
    values.insert("aromaticity".to_string(), Self::aromaticity(&residues));
    values.insert("net_charge_ph7".to_string(), Self::net_charge_ph7(&residues));
    Ok(PhysicochemicalProfile::new(sequence_hash(&normalized), values))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn compute_is_deterministic_and_content_addressed() {
    let calc = StandardPropertyCalculator::new();
    let a = calc.compute("MKVLT").unwrap();
    let b = calc.compute("MKVLT").unwrap();
    assert_eq!(a, b);
    assert_eq!(a.sequence_hash(), sequence_hash("MKVLT"));
    // misma secuencia en minúsculas: mismo perfil
    let c = calc.compute("mkvlt").unwrap();
    assert_eq!(a, c);
  }

  #[test]
  fn molecular_weight_of_glycine_chain() {
    let calc = StandardPropertyCalculator::new();
    let profile = calc.compute("GGG").unwrap();
    let expected = 3.0 * 57.0519 + WATER_MASS;
    assert!((profile.get("molecular_weight").unwrap() - expected).abs() < 1e-6);
  }

  #[test]
  fn gravy_of_isoleucine_is_scale_maximum() {
    let calc = StandardPropertyCalculator::new();
    let profile = calc.compute("III").unwrap();
    assert!((profile.get("gravy").unwrap() - 4.5).abs() < 1e-9);
  }

  #[test]
  fn aromaticity_counts_fwy_fraction() {
    let calc = StandardPropertyCalculator::new();
    let profile = calc.compute("FWYA").unwrap();
    assert!((profile.get("aromaticity").unwrap() - 0.75).abs() < 1e-9);
  }

  #[test]
  fn basic_sequence_has_positive_charge_at_ph7() {
    let calc = StandardPropertyCalculator::new();
    let basic = calc.compute("KKKK").unwrap().get("net_charge_ph7").unwrap();
    let acidic = calc.compute("DDDD").unwrap().get("net_charge_ph7").unwrap();
    assert!(basic > 2.0);
    assert!(acidic < -2.0);
  }

  #[test]
  fn invalid_residue_is_rejected() {
    let calc = StandardPropertyCalculator::new();
    let err = calc.compute("MKXLT").unwrap_err();
    match err {
      DomainError::InvalidSequence(msg) => assert!(msg.contains('X')),
      other => panic!("expected InvalidSequence, got {:?}", other),
    }
    assert!(calc.compute("").is_err());
  }

  #[test]
  fn index_names_match_computed_values() {
    let calc = StandardPropertyCalculator::new();
    let profile = calc.compute("MKVLT").unwrap();
    let names: Vec<String> = profile.values().keys().cloned().collect();
    assert_eq!(names, calc.index_names());
  }
}
