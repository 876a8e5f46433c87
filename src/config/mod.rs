//! Configuration management for the Lex bot
//!
//! Values resolve as env > TOML file > default.

pub mod file;

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::generation::{CooldownScope, DEFAULT_MAX_ATTEMPTS, SamplingPolicy, SelfPlay};
use crate::nlp::DEFAULT_CACHE_CAPACITY;
use crate::{Error, Result};

use file::LexConfigFile;

/// Modules enabled when nothing is configured
pub const DEFAULT_MODULES: &[&str] = &["mystic"];

/// Lex bot configuration
#[derive(Debug)]
pub struct Config {
    /// Discord bot token
    pub discord_token: Option<SecretString>,

    /// Literal token treated as a mention of the bot
    pub mention_workaround: Option<String>,

    /// Enabled modules, in arbitration order
    pub modules: Vec<String>,

    /// Lemmatizer configuration
    pub nlp: NlpConfig,

    /// Generation service configuration
    pub generation: GenerationConfig,

    /// Dialogue module configuration
    pub dialogue: DialogueConfig,

    /// Question-answering module configuration
    pub qa: QaConfig,
}

/// Lemmatizer configuration
#[derive(Debug, Clone)]
pub struct NlpConfig {
    /// Base URL of the lemmatization service; whitespace tokens if unset
    pub url: Option<String>,

    /// Number of cached lemmatizations
    pub cache_capacity: usize,
}

/// Generation service configuration
#[derive(Debug, Clone, Default)]
pub struct GenerationConfig {
    /// Base URL of the generation service
    pub url: Option<String>,

    /// Model identifier passed through to the service
    pub model: Option<String>,
}

/// Dialogue module configuration
#[derive(Debug, Clone)]
pub struct DialogueConfig {
    /// Speaker name for the human side; `{0}` stands in for the real author
    pub selfname: String,

    /// Persona the bot speaks as
    pub target: String,

    /// Capitalize incoming text: first letter upper, the rest lower
    pub capitalize: bool,

    /// Separate turns with `" | "` rather than `" |"`
    pub target_space: bool,

    /// Turns kept in the dialogue window
    pub window_size: usize,

    /// Default cooldown between generations per author
    pub cooldown: Duration,

    /// Track cooldowns per author in each channel
    pub per_channel_cooldown: bool,

    /// Cooldown overrides by channel ID
    pub channel_cooldowns: HashMap<String, Duration>,

    /// Self-play continuation
    pub self_play: SelfPlay,

    /// Maximum generated length, in tokens
    pub max_length: usize,

    /// Retry policy for short samples
    pub sampling: SamplingPolicy,

    /// Token that ends a turn
    pub stop_token: String,

    /// Conditioning text is cut to its last `max_conditioning_chars` characters
    pub max_conditioning_chars: usize,
}

impl DialogueConfig {
    /// Turn separator
    #[must_use]
    pub fn separator(&self) -> &'static str {
        if self.target_space { " | " } else { " |" }
    }

    /// Cooldown key scope
    #[must_use]
    pub const fn cooldown_scope(&self) -> CooldownScope {
        if self.per_channel_cooldown {
            CooldownScope::AuthorInChannel
        } else {
            CooldownScope::Author
        }
    }
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            selfname: "{0}".to_string(),
            target: "Jumin".to_string(),
            capitalize: true,
            target_space: true,
            window_size: 10,
            cooldown: Duration::from_secs(10),
            per_channel_cooldown: false,
            channel_cooldowns: HashMap::new(),
            self_play: SelfPlay {
                continuation_probability: 0.25,
                max_turns: 3,
            },
            max_length: 512,
            sampling: SamplingPolicy {
                max_attempts: DEFAULT_MAX_ATTEMPTS,
                min_text_len: 20,
            },
            stop_token: " |".to_string(),
            max_conditioning_chars: 512,
        }
    }
}

/// Question-answering module configuration
#[derive(Debug, Clone, Default)]
pub struct QaConfig {
    /// Path to the rules file
    pub rules_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the environment and the config file
    #[must_use]
    pub fn load() -> Self {
        Self::resolve(file::load_config_file(), |key| std::env::var(key).ok())
    }

    /// Merge a parsed config file with environment lookups
    #[must_use]
    pub fn resolve(fc: LexConfigFile, env: impl Fn(&str) -> Option<String>) -> Self {
        let discord_token = env("DISCORD_TOKEN")
            .or(fc.api_keys.discord)
            .filter(|t| !t.is_empty())
            .map(SecretString::from);

        let mention_workaround = env("LEX_MENTION_WORKAROUND").or(fc.bot.mention_workaround);

        let modules = env("LEX_MODULES")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .map(ToString::to_string)
                    .collect()
            })
            .or(fc.bot.modules)
            .unwrap_or_else(|| DEFAULT_MODULES.iter().map(ToString::to_string).collect());

        let nlp = NlpConfig {
            url: env("LEX_NLP_URL").or(fc.nlp.url),
            cache_capacity: fc.nlp.cache_capacity.unwrap_or(DEFAULT_CACHE_CAPACITY),
        };

        let generation = GenerationConfig {
            url: env("LEX_GENERATION_URL").or(fc.generation.url),
            model: env("LEX_GENERATION_MODEL").or(fc.generation.model),
        };

        let d = fc.dialogue;
        let defaults = DialogueConfig::default();
        let dialogue = DialogueConfig {
            selfname: d.selfname.unwrap_or(defaults.selfname),
            target: d.target.unwrap_or(defaults.target),
            capitalize: d.capitalize.unwrap_or(defaults.capitalize),
            target_space: d.target_space.unwrap_or(defaults.target_space),
            window_size: d.window_size.unwrap_or(defaults.window_size),
            cooldown: env("LEX_DIALOGUE_COOLDOWN")
                .and_then(|s| s.parse().ok())
                .or(d.cooldown_secs)
                .map_or(defaults.cooldown, Duration::from_secs),
            per_channel_cooldown: d
                .per_channel_cooldown
                .unwrap_or(defaults.per_channel_cooldown),
            channel_cooldowns: d
                .channel_cooldowns
                .into_iter()
                .map(|(channel, secs)| (channel, Duration::from_secs(secs)))
                .collect(),
            self_play: SelfPlay {
                continuation_probability: d
                    .continuation_probability
                    .filter(|p| p.is_finite())
                    .unwrap_or(defaults.self_play.continuation_probability),
                max_turns: d
                    .max_self_play_turns
                    .unwrap_or(defaults.self_play.max_turns),
            },
            max_length: d.max_length.unwrap_or(defaults.max_length),
            sampling: SamplingPolicy {
                max_attempts: d.max_attempts.unwrap_or(defaults.sampling.max_attempts),
                min_text_len: d.min_text_len.unwrap_or(defaults.sampling.min_text_len),
            },
            stop_token: d.stop_token.unwrap_or(defaults.stop_token),
            max_conditioning_chars: d
                .max_conditioning_chars
                .unwrap_or(defaults.max_conditioning_chars),
        };

        let qa = QaConfig {
            rules_path: env("LEX_QA_RULES")
                .or(fc.qa.rules_path)
                .map(PathBuf::from),
        };

        Self {
            discord_token,
            mention_workaround,
            modules,
            nlp,
            generation,
            dialogue,
            qa,
        }
    }

    /// The Discord token, required to serve
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if no token is configured
    pub fn require_discord_token(&self) -> Result<SecretString> {
        self.discord_token
            .as_ref()
            .map(|t| SecretString::from(secrecy::ExposeSecret::expose_secret(t).to_string()))
            .ok_or_else(|| Error::Config("DISCORD_TOKEN is not set".to_string()))
    }

    /// Check if a module is enabled
    #[must_use]
    pub fn module_enabled(&self, name: &str) -> bool {
        self.modules.iter().any(|m| m == name)
    }
}
