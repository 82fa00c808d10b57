//! Request handlers.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use medscan_core::identify::Identification;
use medscan_core::models::{is_valid_national_code, NameMatch, ScanImage};
use medscan_core::registry::{search_by_partial_name, Resolution};
use serde::{Deserialize, Serialize};

use super::{ApiError, AppState};
use crate::prelude::*;

/// Multipart fields accepted as the photo.
const IMAGE_FIELDS: [&str; 2] = ["foto", "file"];

/// Identify the medication in an uploaded photo.
pub async fn identify(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Identification>, ApiError> {
    let mut image = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Error en la subida: {}", e)))?
    {
        if !field.name().is_some_and(|n| IMAGE_FIELDS.contains(&n)) {
            continue;
        }
        let file_name = field
            .file_name()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "upload".to_string());
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Error al leer la imagen: {}", e)))?;
        image = Some(ScanImage::new(file_name, bytes.to_vec()));
        break;
    }

    let image = image
        .filter(|i| !i.is_empty())
        .ok_or_else(|| ApiError::BadRequest("No se envió ninguna imagen".to_string()))?;
    info!(image = %image.id, file = %image.file_name, size = image.bytes.len(), "photo received");

    let scan = state.identifier.read_text(&image).await;
    let mut cache = state.cache.lock().await;
    let identification = state.identifier.identify_text(scan, &mut cache).await;
    Ok(Json(identification))
}

/// Cached or freshly resolved record for a national code.
pub async fn get_medication(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<Resolution>, ApiError> {
    validate_code(&code)?;

    let mut cache = state.cache.lock().await;
    let resolution = state.identifier.resolver().resolve_by_code(&code, &mut cache).await;
    match resolution {
        Resolution::NotFound { code } => Err(ApiError::NotFound(format!(
            "No se encontró el medicamento {code}"
        ))),
        Resolution::Unavailable { reason, .. } => Err(ApiError::BadGateway(reason)),
        found => Ok(Json(found)),
    }
}

/// Drop a code from the cache so the next lookup re-fetches it.
pub async fn invalidate_medication(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<StatusCode, ApiError> {
    validate_code(&code)?;

    let removed = state
        .cache
        .lock()
        .await
        .invalidate_async(&code)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    state.sources.lock().await.remove(&code);

    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!(
            "El medicamento {code} no está en la caché"
        )))
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    q: String,
}

/// Partial-name search over cached records.
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Json<Vec<NameMatch>> {
    let cache = state.cache.lock().await;
    Json(search_by_partial_name(&params.q, &cache))
}

#[derive(Debug, Deserialize)]
pub struct AskParams {
    question: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub code: String,
    pub answer: String,
    pub documents: usize,
}

/// Ask ChatPDF about a cached medication's documents.
pub async fn ask(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(params): Query<AskParams>,
) -> Result<Json<AskResponse>, ApiError> {
    let chatpdf = state
        .chatpdf
        .clone()
        .ok_or_else(|| ApiError::Unavailable("ChatPDF no está configurado".to_string()))?;
    let question = params
        .question
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Falta la pregunta".to_string()))?;

    let documents: Vec<PathBuf> = {
        let cache = state.cache.lock().await;
        let record = cache
            .get(&code)
            .ok_or_else(|| {
                ApiError::NotFound(format!("El medicamento {code} no está en la caché"))
            })?;
        record.local_documents().into_iter().map(PathBuf::from).collect()
    };

    let mut sources = state.sources.lock().await;
    let source_ids = match sources.get(&code) {
        Some(ids) => ids.clone(),
        None => {
            let ids = chatpdf.upload_all(&documents).await;
            if !ids.is_empty() {
                sources.insert(code.clone(), ids.clone());
            }
            ids
        }
    };
    drop(sources);

    let answer = chatpdf.ask(&source_ids, &question).await?;
    Ok(Json(AskResponse {
        code,
        answer,
        documents: source_ids.len(),
    }))
}

fn validate_code(code: &str) -> Result<(), ApiError> {
    if is_valid_national_code(code) {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!(
            "{code:?} no es un código nacional (de 6 a 8 dígitos)"
        )))
    }
}
