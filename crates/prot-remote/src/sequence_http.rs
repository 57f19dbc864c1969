// Archivo: sequence_http.rs
// Propósito: implementación HTTP de `SequenceSource`. Un 404 es ausencia
// registrada (`Ok(None)`); cualquier otro fallo se propaga como error
// externo y el enriquecimiento lo aísla por fila.
use async_trait::async_trait;
use prot_domain::{DomainError, SequenceSource};
use reqwest::StatusCode;
use std::time::Duration;

/// Cliente HTTP de la fuente de secuencias por accesión.
pub struct HttpSequenceSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSequenceSource {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, DomainError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DomainError::ExternalError(format!("no se pudo construir el cliente HTTP: {}", e)))?;
        Ok(Self { client, base_url: base_url.trim_end_matches('/').to_string() })
    }
}

#[async_trait]
impl SequenceSource for HttpSequenceSource {
    async fn fetch(&self, accession: &str) -> Result<Option<String>, DomainError> {
        let url = format!("{}/sequence/{}", self.base_url, accession);
        let response = self.client
                           .get(&url)
                           .send()
                           .await
                           .map_err(|e| DomainError::ExternalError(format!("fallo de red: {}", e)))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(DomainError::ExternalError(format!("estado HTTP {} al consultar {}",
                                                          response.status(), accession)));
        }
        let body = response.text()
                           .await
                           .map_err(|e| DomainError::ExternalError(format!("error leyendo respuesta: {}", e)))?;
        let sequence: String = body.lines()
                                   .filter(|line| !line.starts_with('>'))
                                   .collect::<Vec<_>>()
                                   .join("");
        let sequence = sequence.trim().to_string();
        if sequence.is_empty() {
            return Ok(None);
        }
        Ok(Some(sequence))
    }
}
