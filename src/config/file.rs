//! TOML configuration file loading
//!
//! Supports `~/.config/lex/config.toml` (or `$LEX_CONFIG`) as a persistent
//! config source. All fields are optional; the file is a partial overlay on
//! top of defaults.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct LexConfigFile {
    /// Bot identity and wiring
    #[serde(default)]
    pub bot: BotFileConfig,

    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,

    /// Lemmatizer service
    #[serde(default)]
    pub nlp: NlpFileConfig,

    /// Text generation service
    #[serde(default)]
    pub generation: GenerationFileConfig,

    /// Dialogue module settings
    #[serde(default)]
    pub dialogue: DialogueFileConfig,

    /// Question-answering module settings
    #[serde(default)]
    pub qa: QaFileConfig,
}

/// Bot wiring
#[derive(Debug, Default, Deserialize)]
pub struct BotFileConfig {
    /// Literal token treated as a mention of the bot
    pub mention_workaround: Option<String>,

    /// Enabled modules, in arbitration order
    pub modules: Option<Vec<String>>,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize)]
pub struct ApiKeysFileConfig {
    pub discord: Option<String>,
}

/// Lemmatizer configuration
#[derive(Debug, Default, Deserialize)]
pub struct NlpFileConfig {
    /// Base URL of the lemmatization service
    pub url: Option<String>,

    /// Number of cached lemmatizations
    pub cache_capacity: Option<usize>,
}

/// Generation service configuration
#[derive(Debug, Default, Deserialize)]
pub struct GenerationFileConfig {
    /// Base URL of the generation service
    pub url: Option<String>,

    /// Model identifier passed through to the service
    pub model: Option<String>,
}

/// Dialogue module configuration
#[derive(Debug, Default, Deserialize)]
pub struct DialogueFileConfig {
    pub selfname: Option<String>,
    pub target: Option<String>,
    pub capitalize: Option<bool>,
    pub target_space: Option<bool>,
    pub window_size: Option<usize>,
    pub cooldown_secs: Option<u64>,
    pub per_channel_cooldown: Option<bool>,
    #[serde(default)]
    pub channel_cooldowns: HashMap<String, u64>,
    pub continuation_probability: Option<f64>,
    pub max_self_play_turns: Option<usize>,
    pub max_length: Option<usize>,
    pub min_text_len: Option<usize>,
    pub max_attempts: Option<usize>,
    pub stop_token: Option<String>,
    pub max_conditioning_chars: Option<usize>,
}

/// Question-answering module configuration
#[derive(Debug, Default, Deserialize)]
pub struct QaFileConfig {
    /// Path to the rules file
    pub rules_path: Option<String>,
}

/// Load the TOML config file from `$LEX_CONFIG` or the standard path
///
/// Returns `LexConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> LexConfigFile {
    let path = std::env::var("LEX_CONFIG")
        .ok()
        .map(PathBuf::from)
        .or_else(config_file_path);

    match path {
        Some(path) if path.exists() => load_config_from(&path),
        _ => LexConfigFile::default(),
    }
}

/// Load a TOML config file from an explicit path
///
/// Returns `LexConfigFile::default()` if the file can't be read or parsed.
pub fn load_config_from(path: &Path) -> LexConfigFile {
    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                LexConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            LexConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/lex/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("lex").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[bot]
modules = ["mystic", "dialogue"]

[dialogue]
cooldown_secs = 30

[dialogue.channel_cooldowns]
"1234" = 120
"#
        )
        .unwrap();

        let config = load_config_from(file.path());
        assert_eq!(
            config.bot.modules,
            Some(vec!["mystic".to_string(), "dialogue".to_string()])
        );
        assert_eq!(config.dialogue.cooldown_secs, Some(30));
        assert_eq!(config.dialogue.channel_cooldowns.get("1234"), Some(&120));
        assert!(config.nlp.url.is_none());
    }

    #[test]
    fn test_invalid_file_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "this is = = not toml").unwrap();

        let config = load_config_from(file.path());
        assert!(config.bot.modules.is_none());
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = load_config_from(Path::new("/nonexistent/lex/config.toml"));
        assert!(config.api_keys.discord.is_none());
    }
}
