use std::env;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_CAPTION_API_BASE: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_TRANSLATE_API_BASE: &str = "https://translate.googleapis.com";

/// Runtime configuration, resolved from the environment once at startup and
/// threaded into the handlers through shared state.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    /// When set, `/caption` skips the neural backend and only runs the
    /// color/orientation analyzer.
    pub lightweight_caption: bool,
    /// Absent keys are not fatal: neural captioning fails on first use and
    /// the endpoint falls back to the analyzer.
    pub gemini_api_key: Option<String>,
    pub caption_api_base: String,
    pub translate_api_base: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string()),
            lightweight_caption: lightweight_enabled(
                env::var("USE_LIGHTWEIGHT_CAPTION").ok().as_deref(),
            ),
            gemini_api_key: env::var("GEMINI_API_KEY").ok().filter(|key| !key.is_empty()),
            caption_api_base: env::var("CAPTION_API_BASE")
                .unwrap_or_else(|_| DEFAULT_CAPTION_API_BASE.to_string()),
            translate_api_base: env::var("TRANSLATE_API_BASE")
                .unwrap_or_else(|_| DEFAULT_TRANSLATE_API_BASE.to_string()),
        }
    }
}

// Only a case-insensitive "true" opts in; anything else keeps neural mode.
fn lightweight_enabled(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.eq_ignore_ascii_case("true"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lightweight_flag_accepts_true_case_insensitively() {
        assert!(lightweight_enabled(Some("true")));
        assert!(lightweight_enabled(Some("TRUE")));
        assert!(lightweight_enabled(Some("True")));
    }

    #[test]
    fn lightweight_flag_rejects_everything_else() {
        assert!(!lightweight_enabled(None));
        assert!(!lightweight_enabled(Some("")));
        assert!(!lightweight_enabled(Some("1")));
        assert!(!lightweight_enabled(Some("yes")));
        assert!(!lightweight_enabled(Some("false")));
    }
}
