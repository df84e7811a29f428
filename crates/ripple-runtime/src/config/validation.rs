//! Semantic checks on a merged configuration.

use super::error::{ConfigError, ConfigResult};
use super::schema::{LogOutput, RippleConfig};

/// Validates the configuration.
///
/// Serde already enforces shape and enum values; this checks the rules
/// between fields.
pub fn validate_config(config: &RippleConfig) -> ConfigResult<()> {
    let bot = &config.bot;

    if bot.access_token.trim().is_empty() {
        return Err(ConfigError::missing_field("bot.access_token"));
    }
    if bot.group_id <= 0 {
        return Err(ConfigError::validation(format!(
            "bot.group_id must be positive, got {}",
            bot.group_id
        )));
    }
    if !(bot.api_url.starts_with("http://") || bot.api_url.starts_with("https://")) {
        return Err(ConfigError::validation(format!(
            "bot.api_url must be an http(s) URL, got '{}'",
            bot.api_url
        )));
    }
    if bot.api_version.trim().is_empty() {
        return Err(ConfigError::missing_field("bot.api_version"));
    }

    let wait = config.longpoll.wait;
    if wait == 0 {
        return Err(ConfigError::validation("longpoll.wait must be at least 1"));
    }
    // The HTTP client must outlive the server-side hold.
    if bot.timeout_secs <= u64::from(wait) {
        return Err(ConfigError::validation(format!(
            "bot.timeout_secs ({}) must exceed longpoll.wait ({wait})",
            bot.timeout_secs
        )));
    }

    if config.logging.output == LogOutput::File && config.logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }

    Ok(())
}
