//! CIMA (AEMPS) REST client.
//!
//! `GET {base}/presentacion/{code}` returns the presentation with its
//! document links, each tagged with a `tipo` kind code.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use super::{Presentation, RegistryClient, RegistryDocument, RegistryError};

pub const DEFAULT_CIMA_URL: &str = "https://cima.aemps.es/cima/rest";

/// Default registry timeout.
pub const DEFAULT_REGISTRY_TIMEOUT: Duration = Duration::from_secs(10);

/// CIMA presentation payload (only the fields we use).
#[derive(Debug, Deserialize)]
struct CimaPresentation {
    #[serde(default)]
    nombre: String,
    labtitular: Option<String>,
    pactivos: Option<String>,
    nregistro: Option<String>,
    #[serde(default)]
    docs: Vec<CimaDocument>,
}

#[derive(Debug, Deserialize)]
struct CimaDocument {
    tipo: i64,
    url: Option<String>,
}

/// Registry client for the Spanish medicines agency.
pub struct CimaClient {
    client: Client,
    base_url: String,
}

impl CimaClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RegistryError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl RegistryClient for CimaClient {
    async fn presentation(&self, code: &str) -> Result<Option<Presentation>, RegistryError> {
        let url = format!("{}/presentacion/{}", self.base_url, code);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT || !status.is_success() {
            debug!(code, status = status.as_u16(), "presentation not in registry");
            return Ok(None);
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(None);
        }

        let payload: CimaPresentation = serde_json::from_str(&body)
            .map_err(|e| RegistryError::Decode(e.to_string()))?;

        Ok(Some(payload.into_presentation(code)))
    }
}

impl CimaPresentation {
    fn into_presentation(self, code: &str) -> Presentation {
        Presentation {
            code: code.to_string(),
            name: self.nombre,
            manufacturer: self.labtitular,
            active_ingredients: self.pactivos,
            registration_number: self.nregistro,
            documents: self
                .docs
                .into_iter()
                .filter_map(|d| {
                    d.url.map(|url| RegistryDocument {
                        kind_code: d.tipo,
                        url,
                    })
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_mapping() {
        let json = r#"{
            "cn": "654321",
            "nombre": "IBUPROFENO CINFA 600 mg COMPRIMIDOS RECUBIERTOS CON PELICULA EFG, 40 comprimidos",
            "labtitular": "Laboratorios Cinfa, S.A.",
            "pactivos": "IBUPROFENO",
            "nregistro": "64466",
            "docs": [
                {"tipo": 1, "url": "https://cima.aemps.es/cima/pdfs/ft/64466/FT_64466.pdf", "secc": false},
                {"tipo": 2, "url": "https://cima.aemps.es/cima/pdfs/p/64466/P_64466.pdf", "secc": false},
                {"tipo": 2}
            ]
        }"#;

        let payload: CimaPresentation = serde_json::from_str(json).unwrap();
        let presentation = payload.into_presentation("654321");

        assert_eq!(presentation.code, "654321");
        assert_eq!(presentation.manufacturer.as_deref(), Some("Laboratorios Cinfa, S.A."));
        assert_eq!(presentation.registration_number.as_deref(), Some("64466"));
        assert_eq!(presentation.documents.len(), 2);
        assert_eq!(presentation.documents[0].kind_code, 1);
    }

    #[test]
    fn test_payload_without_docs() {
        let payload: CimaPresentation = serde_json::from_str(r#"{"nombre": "X"}"#).unwrap();
        assert!(payload.into_presentation("123456").documents.is_empty());
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client =
            CimaClient::new("https://cima.aemps.es/cima/rest/", DEFAULT_REGISTRY_TIMEOUT).unwrap();
        assert_eq!(client.base_url(), "https://cima.aemps.es/cima/rest");
    }
}
