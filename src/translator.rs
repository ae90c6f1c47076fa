//! Client for the external translation provider. Source language is always
//! auto-detected; the target code comes from the request.

use anyhow::{anyhow, bail, Context, Result};
use serde_json::Value;

use crate::config::Config;

pub struct Translator {
    http: reqwest::Client,
    api_base: String,
}

impl Translator {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: config.translate_api_base.clone(),
        }
    }

    pub async fn translate(&self, text: &str, target_lang: &str) -> Result<String> {
        let url = format!("{}/translate_a/single", self.api_base);
        let response = self
            .http
            .get(&url)
            .query(&[
                ("client", "gtx"),
                ("sl", "auto"),
                ("tl", target_lang),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await
            .context("translation request failed")?;

        let status = response.status();
        if !status.is_success() {
            bail!("translation API error {status}");
        }

        let body: Value = response
            .json()
            .await
            .context("translation response was not valid JSON")?;
        translated_text(&body).ok_or_else(|| anyhow!("translation response had no segments"))
    }
}

// The provider returns nested arrays; the translation is the first element
// of each segment in the first array, concatenated in order.
fn translated_text(body: &Value) -> Option<String> {
    let segments = body.get(0)?.as_array()?;
    let mut out = String::new();
    for segment in segments {
        if let Some(part) = segment.get(0).and_then(Value::as_str) {
            out.push_str(part);
        }
    }
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}
