pub mod events;
pub mod research;

pub mod settings {
    use serde::{Deserialize, Serialize};

    fn default_model() -> String {
        "gpt-4o-mini".into()
    }

    fn default_temperature() -> f32 {
        0.7
    }

    fn default_breadth() -> usize {
        2
    }

    fn default_depth() -> usize {
        2
    }

    fn default_max_clarifying_questions() -> usize {
        3
    }

    fn default_learnings_cap() -> usize {
        5
    }

    fn default_search_limit() -> usize {
        5
    }

    fn default_search_timeout_ms() -> u64 {
        15_000
    }

    fn default_concurrency() -> usize {
        2
    }

    fn default_max_search_calls() -> Option<usize> {
        Some(64)
    }

    fn default_max_runtime_secs() -> Option<u64> {
        Some(900)
    }

    fn default_language() -> String {
        "English".into()
    }

    /// Settings rejected before a run starts.
    #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
    pub enum SettingsError {
        #[error("{field} must be at least 1 (got {value})")]
        BelowMinimum { field: &'static str, value: usize },

        #[error("model name must not be empty")]
        EmptyModel,
    }

    /// Tuning knobs for one research run.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ResearchSettings {
        #[serde(default = "default_model")]
        pub model: String, // e.g., "gpt-4o-mini"
        #[serde(default = "default_temperature")]
        pub temperature: f32,
        /// Queries generated at the root level
        #[serde(default = "default_breadth")]
        pub breadth: usize,
        /// Recursive expansion levels
        #[serde(default = "default_depth")]
        pub depth: usize,
        #[serde(default = "default_max_clarifying_questions")]
        pub max_clarifying_questions: usize,
        /// Learnings kept per query
        #[serde(default = "default_learnings_cap")]
        pub learnings_cap: usize,
        /// Documents requested per search
        #[serde(default = "default_search_limit")]
        pub search_limit: usize,
        #[serde(default = "default_search_timeout_ms")]
        pub search_timeout_ms: u64,
        /// Sibling queries processed at once; 1 is strictly sequential
        #[serde(default = "default_concurrency")]
        pub concurrency: usize,
        #[serde(default = "default_max_search_calls")]
        pub max_search_calls: Option<usize>,
        #[serde(default = "default_max_runtime_secs")]
        pub max_runtime_secs: Option<u64>,
        /// Language the clarifying questions are asked in
        #[serde(default = "default_language")]
        pub language: String,
    }

    impl ResearchSettings {
        pub fn validate(&self) -> Result<(), SettingsError> {
            let minimums = [
                ("breadth", self.breadth),
                ("depth", self.depth),
                ("concurrency", self.concurrency),
                ("learnings_cap", self.learnings_cap),
                ("search_limit", self.search_limit),
            ];
            for (field, value) in minimums {
                if value < 1 {
                    return Err(SettingsError::BelowMinimum { field, value });
                }
            }
            if self.model.trim().is_empty() {
                return Err(SettingsError::EmptyModel);
            }
            Ok(())
        }
    }

    impl Default for ResearchSettings {
        fn default() -> Self {
            Self {
                model: default_model(),
                temperature: default_temperature(),
                breadth: default_breadth(),
                depth: default_depth(),
                max_clarifying_questions: default_max_clarifying_questions(),
                learnings_cap: default_learnings_cap(),
                search_limit: default_search_limit(),
                search_timeout_ms: default_search_timeout_ms(),
                concurrency: default_concurrency(),
                max_search_calls: default_max_search_calls(),
                max_runtime_secs: default_max_runtime_secs(),
                language: default_language(),
            }
        }
    }

    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    pub struct ProviderAuth {
        pub api_key: Option<String>,
    }

    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    pub struct ProviderSettings {
        #[serde(default)]
        pub openai_auth: ProviderAuth,
        #[serde(default)]
        pub openai_base_url: Option<String>,
        #[serde(default)]
        pub firecrawl_auth: ProviderAuth,
        #[serde(default)]
        pub firecrawl_base_url: Option<String>,
    }

    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    pub struct AppSettings {
        #[serde(default)]
        pub research: ResearchSettings,
        #[serde(default)]
        pub providers: ProviderSettings,
    }
}

pub mod agent_api {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ChatMessage {
        pub role: String, // "system" | "user" | "assistant"
        pub content: String,
    }

    impl ChatMessage {
        pub fn system(content: impl Into<String>) -> Self {
            Self {
                role: "system".to_string(),
                content: content.into(),
            }
        }

        pub fn user(content: impl Into<String>) -> Self {
            Self {
                role: "user".to_string(),
                content: content.into(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::settings::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = ResearchSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.breadth, 2);
        assert_eq!(settings.depth, 2);
        assert_eq!(settings.learnings_cap, 5);
        assert_eq!(settings.search_timeout_ms, 15_000);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let settings: AppSettings =
            serde_json::from_str(r#"{"research": {"breadth": 4, "language": "Korean"}}"#).unwrap();
        assert_eq!(settings.research.breadth, 4);
        assert_eq!(settings.research.depth, 2);
        assert_eq!(settings.research.language, "Korean");
        assert_eq!(settings.research.model, "gpt-4o-mini");
        assert!(settings.providers.openai_auth.api_key.is_none());
    }

    #[test]
    fn test_zero_breadth_rejected() {
        let settings = ResearchSettings {
            breadth: 0,
            ..Default::default()
        };
        assert_eq!(
            settings.validate(),
            Err(SettingsError::BelowMinimum {
                field: "breadth",
                value: 0
            })
        );
    }

    #[test]
    fn test_blank_model_rejected() {
        let settings = ResearchSettings {
            model: "  ".into(),
            ..Default::default()
        };
        assert_eq!(settings.validate(), Err(SettingsError::EmptyModel));
    }

    #[test]
    fn test_settings_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let mut settings = AppSettings::default();
        settings.research.concurrency = 1;
        settings.providers.openai_base_url = Some("http://localhost:8080".into());
        std::fs::write(&path, serde_json::to_vec_pretty(&settings).unwrap()).unwrap();

        let loaded: AppSettings = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(loaded.research.concurrency, 1);
        assert_eq!(
            loaded.providers.openai_base_url.as_deref(),
            Some("http://localhost:8080")
        );
    }
}
