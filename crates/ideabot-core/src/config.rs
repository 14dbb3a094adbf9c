use std::{env, fs, path::Path, time::Duration};

use crate::{domain::ChatId, errors::Error, flood::FloodConfig, poll::PollConfig, Result};

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Bot API client knobs shared by the relay and the issue bridge.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub base_url: String,
    /// Total attempts per call, including the first.
    pub retries: u32,
    /// Wait before retry `i` is `backoff_base * 2^i`.
    pub backoff_base: Duration,
    /// Server-side wait for `getUpdates`.
    pub long_poll_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE.to_string(),
            retries: 3,
            backoff_base: Duration::from_millis(1500),
            long_poll_timeout: Duration::from_secs(50),
        }
    }
}

/// Typed configuration for the relay process.
#[derive(Clone, Debug)]
pub struct Config {
    pub bot_token: String,
    /// Every forwarded idea lands in this chat, and nowhere else.
    pub admin_chat_id: ChatId,
    pub api: ApiConfig,
    pub poll: PollConfig,
    pub flood: FloodConfig,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let bot_token = env_str("BOT_TOKEN").and_then(non_empty).ok_or_else(|| {
            Error::Config("BOT_TOKEN environment variable is required".to_string())
        })?;
        let admin_chat_id = env_str("ADMIN_CHAT_ID")
            .and_then(non_empty)
            .ok_or_else(|| {
                Error::Config("ADMIN_CHAT_ID environment variable is required".to_string())
            })?
            .trim()
            .parse::<i64>()
            .map(ChatId)
            .map_err(|_| Error::Config("ADMIN_CHAT_ID must be a numeric chat id".to_string()))?;

        let api = ApiConfig {
            base_url: env_str("TELEGRAM_API_BASE")
                .and_then(non_empty)
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            retries: env_u32("API_RETRIES").unwrap_or(3).max(1),
            backoff_base: Duration::from_millis(env_u64("API_BACKOFF_MS").unwrap_or(1500)),
            long_poll_timeout: Duration::from_secs(env_u64("LONG_POLL_TIMEOUT_SECS").unwrap_or(50)),
        };

        let poll = PollConfig {
            error_sleep: Duration::from_secs(env_u64("SLEEP_ON_ERROR_SECS").unwrap_or(2)),
        };

        let flood = FloodConfig {
            enabled: env_bool("ANTI_FLOOD_ENABLED").unwrap_or(true),
            max_in_window: env_u64("FLOOD_MAX_MESSAGES").unwrap_or(5) as usize,
            window: Duration::from_secs(env_u64("FLOOD_WINDOW_SECS").unwrap_or(60)),
            cooldown: Duration::from_secs(env_u64("FLOOD_COOLDOWN_SECS").unwrap_or(120)),
        };

        Ok(Self {
            bot_token,
            admin_chat_id,
            api,
            poll,
            flood,
        })
    }
}

/// Load `KEY=VALUE` lines from a dotenv file without overriding variables
/// that are already set.
pub fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

pub(crate) fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

pub(crate) fn env_bool(key: &str) -> Option<bool> {
    env_str(key).map(|s| {
        matches!(
            s.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

pub(crate) fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

pub(crate) fn env_u32(key: &str) -> Option<u32> {
    env_str(key).and_then(|s| s.trim().parse::<u32>().ok())
}

pub(crate) fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn tmp(prefix: &str) -> PathBuf {
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or(Duration::from_secs(0))
            .as_millis();
        let pid = std::process::id();
        PathBuf::from(format!("/tmp/{prefix}-{pid}-{ts}"))
    }

    #[test]
    fn dotenv_sets_new_keys_and_keeps_existing_ones() {
        let pid = std::process::id();
        let fresh = format!("IDEABOT_TEST_FRESH_{pid}");
        let taken = format!("IDEABOT_TEST_TAKEN_{pid}");
        env::set_var(&taken, "original");

        let path = tmp("ideabot-dotenv");
        fs::write(
            &path,
            format!(
                "# comment\n{fresh}=\"from file\"\n{taken}=overridden\nNOT_A_PAIR\n  \n"
            ),
        )
        .unwrap();

        load_dotenv_if_present(&path);

        assert_eq!(env::var(&fresh).unwrap(), "from file");
        assert_eq!(env::var(&taken).unwrap(), "original");

        env::remove_var(&fresh);
        env::remove_var(&taken);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn missing_dotenv_is_a_no_op() {
        load_dotenv_if_present(Path::new("/tmp/ideabot-definitely-missing.env"));
    }

    #[test]
    fn non_empty_rejects_whitespace() {
        assert_eq!(non_empty("  ".to_string()), None);
        assert_eq!(non_empty("x".to_string()), Some("x".to_string()));
    }
}
