use std::{
    env,
    path::{Path, PathBuf},
};

use ideabot_core::{
    config::{load_dotenv_if_present, ApiConfig},
    errors::Error,
    Result,
};

pub const DEFAULT_GITHUB_API_BASE: &str = "https://api.github.com";

/// Configuration for the one-shot issue bridge.
#[derive(Clone, Debug)]
pub struct BridgeConfig {
    pub bot_token: String,
    pub api: ApiConfig,
    pub github_token: String,
    /// `owner/name`, as provided by CI environments.
    pub github_repository: String,
    pub github_api_base: String,
    pub cursor_file: PathBuf,
    pub issue_label: String,
    pub page_limit: u32,
}

impl BridgeConfig {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let bot_token = required("BOT_TOKEN")?;
        let github_token = required("GITHUB_TOKEN")?;
        let github_repository = required("GITHUB_REPOSITORY")?;
        if !github_repository.contains('/') {
            return Err(Error::Config(
                "GITHUB_REPOSITORY must be in owner/name form".to_string(),
            ));
        }

        let api = ApiConfig {
            base_url: optional("TELEGRAM_API_BASE")
                .unwrap_or_else(|| ideabot_core::config::DEFAULT_API_BASE.to_string()),
            ..ApiConfig::default()
        };

        Ok(Self {
            bot_token,
            api,
            github_token,
            github_repository,
            github_api_base: optional("GITHUB_API_BASE")
                .unwrap_or_else(|| DEFAULT_GITHUB_API_BASE.to_string()),
            cursor_file: optional("LAST_UPDATE_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("last_update.txt")),
            issue_label: optional("ISSUE_LABEL").unwrap_or_else(|| "idea".to_string()),
            page_limit: optional("UPDATES_PAGE_LIMIT")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(100),
        })
    }
}

fn required(key: &str) -> Result<String> {
    optional(key).ok_or_else(|| Error::Config(format!("{key} environment variable is required")))
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.trim().is_empty())
}
