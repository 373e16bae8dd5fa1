//! `POST /generate_caption`: the caption -> translate -> speak pipeline.

use std::time::Instant;

use axum::extract::{Multipart, State};
use axum::Json;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::api::{translate, tts, AppState};
use crate::error::ApiError;
use crate::postprocess::clean_caption;

/// Language the captioning model produces natively; translation is skipped
/// when it is also the requested output language.
const NATIVE_LANG: &str = "en";

#[derive(Serialize, Deserialize)]
pub struct CaptionResponse {
    pub caption: String,
    pub audio: String,
}

pub async fn generate_caption(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<CaptionResponse>, ApiError> {
    let start = Instant::now();

    let mut image_bytes = None;
    let mut language = None;
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("image") => image_bytes = Some(field.bytes().await?),
            Some("language") => language = Some(field.text().await?),
            _ => {}
        }
    }

    let image_bytes = image_bytes.ok_or(ApiError::MissingImage)?;
    let target_lang = language.unwrap_or_else(|| NATIVE_LANG.to_string());
    tracing::debug!(
        bytes = image_bytes.len(),
        lang = %target_lang,
        "received caption request"
    );

    let img = image::load_from_memory(&image_bytes)?;

    let model = state.model.clone();
    let raw = tokio::task::spawn_blocking(move || model.caption(&img))
        .await
        .map_err(|e| ApiError::Caption(e.into()))?
        .map_err(ApiError::Caption)?;
    tracing::debug!(caption = %raw, "model output");

    let mut caption = clean_caption(&raw);
    if target_lang != NATIVE_LANG {
        caption = translate::translate(&state.http, &caption, &target_lang)
            .await
            .map_err(ApiError::Translation)?;
        tracing::debug!(caption = %caption, lang = %target_lang, "translated caption");
    }

    let audio = tts::synthesize(&state.http, &caption, &target_lang)
        .await
        .map_err(ApiError::Synthesis)?;

    tracing::info!(
        elapsed_ms = start.elapsed().as_millis() as u64,
        lang = %target_lang,
        "caption generated"
    );

    Ok(Json(CaptionResponse {
        caption,
        audio: BASE64.encode(audio),
    }))
}
