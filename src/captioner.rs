//! Adapter over a remote pretrained vision model. The model is consumed as a
//! black box: image bytes in, one short caption out.

use anyhow::{anyhow, bail, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;
use serde_json::{json, Value};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::config::Config;

/// Returned when the provider answers but carries no usable caption text.
pub const NEURAL_FALLBACK_CAPTION: &str = "An image with various visual elements";

const CAPTION_MODEL: &str = "gemini-2.5-flash";
const CAPTION_PROMPT: &str = "Describe this image in one short sentence.";
const MAX_INFERENCE_EDGE: u32 = 512;
const MAX_NEW_TOKENS: u32 = 20;
const JPEG_QUALITY: u8 = 85;

pub struct NeuralCaptioner {
    api_base: String,
    api_key: Option<String>,
    backend: OnceCell<CaptionBackend>,
}

struct CaptionBackend {
    http: reqwest::Client,
    endpoint: String,
}

impl NeuralCaptioner {
    pub fn new(config: &Config) -> Self {
        Self {
            api_base: config.caption_api_base.clone(),
            api_key: config.gemini_api_key.clone(),
            backend: OnceCell::new(),
        }
    }

    // Initialized at most once per process; concurrent first callers share
    // the same init future and every later call reuses the backend.
    async fn backend(&self) -> Result<&CaptionBackend> {
        self.backend
            .get_or_try_init(|| async {
                let key = self
                    .api_key
                    .as_deref()
                    .ok_or_else(|| anyhow!("GEMINI_API_KEY is not set"))?;
                info!(model = CAPTION_MODEL, "initializing caption backend");
                let http = reqwest::Client::builder()
                    .build()
                    .context("failed to build caption HTTP client")?;
                let endpoint = format!(
                    "{}/v1beta/models/{}:generateContent?key={}",
                    self.api_base, CAPTION_MODEL, key
                );
                Ok(CaptionBackend { http, endpoint })
            })
            .await
    }

    /// Caption an image with deterministic decoding, bounded to
    /// [`MAX_NEW_TOKENS`] tokens. Transport and provider failures are
    /// returned to the caller; the caption endpoint owns the fallback.
    pub async fn caption(&self, image_bytes: &[u8]) -> Result<String> {
        let backend = self.backend().await?;

        let image = image::load_from_memory(image_bytes)
            .context("failed to decode image for captioning")?;
        let image = DynamicImage::ImageRgb8(image.to_rgb8());
        let encoded = encode_for_inference(&shrink_for_inference(image))?;

        let payload = json!({
            "contents": [{
                "parts": [
                    { "text": CAPTION_PROMPT },
                    { "inline_data": { "mime_type": "image/jpeg", "data": encoded } }
                ]
            }],
            "generationConfig": {
                "temperature": 0.0,
                "candidateCount": 1,
                "maxOutputTokens": MAX_NEW_TOKENS
            }
        });

        debug!("sending caption request");
        let response = backend
            .http
            .post(&backend.endpoint)
            .json(&payload)
            .send()
            .await
            .context("caption request failed")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("failed to read caption response")?;
        if !status.is_success() {
            bail!("caption API error {}: {}", status, truncated(&body, 200));
        }

        let result: Value =
            serde_json::from_str(&body).context("caption response was not valid JSON")?;
        let caption = result["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .unwrap_or("")
            .trim();
        if caption.is_empty() {
            return Ok(NEURAL_FALLBACK_CAPTION.to_string());
        }
        Ok(caption.to_string())
    }
}

/// Downscale so neither edge exceeds [`MAX_INFERENCE_EDGE`], preserving
/// aspect ratio. Smaller images pass through untouched.
fn shrink_for_inference(image: DynamicImage) -> DynamicImage {
    if image.width() <= MAX_INFERENCE_EDGE && image.height() <= MAX_INFERENCE_EDGE {
        image
    } else {
        image.thumbnail(MAX_INFERENCE_EDGE, MAX_INFERENCE_EDGE)
    }
}

fn encode_for_inference(image: &DynamicImage) -> Result<String> {
    let mut jpeg = Vec::new();
    image
        .write_to(
            &mut std::io::Cursor::new(&mut jpeg),
            image::ImageOutputFormat::Jpeg(JPEG_QUALITY),
        )
        .context("failed to encode image for inference")?;
    Ok(STANDARD.encode(&jpeg))
}

fn truncated(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn solid(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([10, 20, 30])))
    }

    #[test]
    fn shrink_caps_the_long_edge_and_keeps_aspect() {
        let shrunk = shrink_for_inference(solid(1024, 512));
        assert_eq!((shrunk.width(), shrunk.height()), (512, 256));

        let shrunk = shrink_for_inference(solid(400, 1600));
        assert_eq!((shrunk.width(), shrunk.height()), (128, 512));
    }

    #[test]
    fn shrink_never_upscales() {
        let shrunk = shrink_for_inference(solid(300, 200));
        assert_eq!((shrunk.width(), shrunk.height()), (300, 200));
    }

    #[test]
    fn encoded_payload_is_valid_base64_jpeg() {
        let encoded = encode_for_inference(&solid(32, 16)).unwrap();
        let jpeg = STANDARD.decode(encoded).unwrap();
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (32, 16));
    }

    #[test]
    fn truncation_is_char_safe() {
        assert_eq!(truncated("héllo wörld", 5), "héllo");
        assert_eq!(truncated("shor", 200), "shor");
    }

    #[tokio::test]
    async fn missing_api_key_is_an_initialization_error() {
        let config = Config {
            bind_addr: "127.0.0.1:0".to_string(),
            lightweight_caption: false,
            gemini_api_key: None,
            caption_api_base: "http://127.0.0.1:9".to_string(),
            translate_api_base: "http://127.0.0.1:9".to_string(),
        };
        let captioner = NeuralCaptioner::new(&config);
        let err = captioner.caption(&[0u8; 4]).await.unwrap_err();
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }
}
