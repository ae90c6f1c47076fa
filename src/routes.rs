use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Form, Json,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{analyzer, AppState};

pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

const SIZE_LIMIT_MESSAGE: &str = "File too large. Please upload an image smaller than 5MB.";

#[derive(Serialize, Deserialize)]
pub struct CaptionResponse {
    pub caption: String,
}

#[derive(Serialize, Deserialize)]
pub struct TranslationResponse {
    pub translated_text: String,
}

#[derive(Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
}

#[derive(Deserialize)]
pub struct TranslateForm {
    pub text: String,
    pub target_lang: String,
}

/// POST /caption - caption an uploaded image.
///
/// Oversized uploads are the one true protocol error (413). Everything else
/// degrades: neural failures fall back to the analyzer, and upload problems
/// come back as an `{"error": ...}` payload.
pub async fn caption(State(state): State<Arc<AppState>>, mut multipart: Multipart) -> Response {
    let data = match read_image_field(&mut multipart).await {
        Ok(data) => data,
        Err(reply) => return reply,
    };

    if data.len() > MAX_IMAGE_BYTES {
        return (StatusCode::PAYLOAD_TOO_LARGE, SIZE_LIMIT_MESSAGE).into_response();
    }

    let caption = if state.config.lightweight_caption {
        analyzer::describe_image(&data)
    } else {
        match state.captioner.caption(&data).await {
            Ok(caption) => caption,
            Err(err) => {
                warn!("neural captioner failed, using color analysis: {err:#}");
                analyzer::describe_image(&data)
            }
        }
    };
    // Release the upload buffer before serializing the response.
    drop(data);

    Json(CaptionResponse { caption }).into_response()
}

/// GET /caption/health - static liveness payload, independent of any
/// captioner state.
pub async fn caption_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "image_caption",
    })
}

/// POST /translate - forward text to the translation provider.
pub async fn translate(
    State(state): State<Arc<AppState>>,
    Form(form): Form<TranslateForm>,
) -> Response {
    match state.translator.translate(&form.text, &form.target_lang).await {
        Ok(translated_text) => Json(TranslationResponse { translated_text }).into_response(),
        Err(err) => {
            warn!("translation failed: {err:#}");
            Json(ErrorResponse {
                error: err.to_string(),
            })
            .into_response()
        }
    }
}

async fn read_image_field(multipart: &mut Multipart) -> Result<Bytes, Response> {
    while let Some(field) = multipart.next_field().await.map_err(upload_error)? {
        if field.name() == Some("file") {
            return field.bytes().await.map_err(upload_error);
        }
    }
    Err(error_payload(
        "Failed to process image: missing multipart field 'file'",
    ))
}

fn upload_error(err: MultipartError) -> Response {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        (StatusCode::PAYLOAD_TOO_LARGE, SIZE_LIMIT_MESSAGE).into_response()
    } else {
        error_payload(&format!("Failed to process image: {err}"))
    }
}

fn error_payload(message: &str) -> Response {
    Json(ErrorResponse {
        error: message.to_string(),
    })
    .into_response()
}
