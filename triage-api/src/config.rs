use std::str::FromStr;

use serde::Deserialize;
use serde_with::serde_as;
use strum::{Display, EnumString};

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub jira: JiraSettings,
    pub openai: OpenAiSettings,
    #[serde(default)]
    pub similarity: SimilaritySettings,
    #[serde(default)]
    pub sync: SyncSettings,
    #[serde(default)]
    pub session: SessionSettings,
}

#[serde_as]
#[derive(Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde_as(as = "serde_with::DisplayFromStr")]
    pub port: u16,
    pub host: String,
}

#[derive(Deserialize, Clone)]
pub struct JiraSettings {
    pub base_url: String,
    pub email: String,
    pub api_token: String,
    pub project_key: String,
}

#[derive(Deserialize, Clone)]
pub struct OpenAiSettings {
    pub api_key: String,
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    #[serde(default = "default_chat_model")]
    pub guardrail_model: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct SimilaritySettings {
    #[serde(default = "default_similarity_threshold")]
    pub threshold: f64,
    #[serde(default = "default_duplicate_threshold")]
    pub duplicate_threshold: f64,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

#[derive(Deserialize, Clone, Debug)]
pub struct SyncSettings {
    #[serde(default = "default_sync_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_sync_on_startup")]
    pub on_startup: bool,
}

#[derive(Deserialize, Clone, Debug)]
pub struct SessionSettings {
    #[serde(default = "default_session_idle_secs")]
    pub idle_timeout_secs: u64,
    #[serde(default = "default_max_sessions")]
    pub max_sessions: u64,
}

fn default_openai_base_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_chat_model() -> String {
    "gpt-4-turbo-preview".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_similarity_threshold() -> f64 {
    0.3
}

fn default_duplicate_threshold() -> f64 {
    0.9
}

fn default_max_results() -> usize {
    5
}

fn default_sync_interval_secs() -> u64 {
    86_400
}

fn default_sync_on_startup() -> bool {
    true
}

fn default_session_idle_secs() -> u64 {
    3_600
}

fn default_max_sessions() -> u64 {
    10_000
}

impl Default for SimilaritySettings {
    fn default() -> Self {
        Self {
            threshold: default_similarity_threshold(),
            duplicate_threshold: default_duplicate_threshold(),
            max_results: default_max_results(),
        }
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            interval_secs: default_sync_interval_secs(),
            on_startup: default_sync_on_startup(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            idle_timeout_secs: default_session_idle_secs(),
            max_sessions: default_max_sessions(),
        }
    }
}

pub fn read_config() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir().expect("Failed to determine the current directory");
    let config_directory = base_path.join("config");

    let environment = Environment::from_str(
        std::env::var("APP_ENVIRONMENT")
            .unwrap_or_else(|_| "local".into())
            .as_str(),
    )
    .expect("Failed to parse APP_ENVIRONMENT");
    let environment_filename = format!("{}.yaml", environment);

    let settings = config::Config::builder()
        .add_source(config::File::from(config_directory.join("base.yaml")))
        .add_source(config::File::from(
            config_directory.join(environment_filename),
        ))
        .add_source(
            config::Environment::with_prefix("TRIAGE")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}

#[derive(Display, Debug, EnumString)]
pub enum Environment {
    #[strum(ascii_case_insensitive, serialize = "local")]
    Local,
    #[strum(ascii_case_insensitive, serialize = "production")]
    Production,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tunables_default_when_omitted() {
        let similarity: SimilaritySettings = serde_json::from_str("{}").unwrap();
        assert_eq!(similarity.threshold, 0.3);
        assert_eq!(similarity.duplicate_threshold, 0.9);
        assert_eq!(similarity.max_results, 5);

        let sync: SyncSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(sync.interval_secs, 86_400);
        assert!(sync.on_startup);
    }
}
