use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

pub const DEFAULT_RELAY_URL: &str = "http://127.0.0.1:3000";

/// Persisted client configuration. Loaded once at startup, saved on explicit
/// edits, and treated as read-only while an exchange is in flight.
///
/// Generation parameters are stored for the user's benefit but are not sent
/// with relay requests; the relay applies its own fixed sampling parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub model: String,
    #[serde(default = "defaults::temperature")]
    pub temperature: f64,
    #[serde(default = "defaults::max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "defaults::top_p")]
    pub top_p: f64,
    #[serde(default)]
    pub frequency_penalty: f64,
    #[serde(default)]
    pub presence_penalty: f64,
    #[serde(default)]
    pub enable_vision: bool,
    /// Base URL of the relay server, when it is not running locally.
    pub relay_url: Option<String>,
}

mod defaults {
    pub fn temperature() -> f64 {
        0.7
    }

    pub fn max_tokens() -> u32 {
        500
    }

    pub fn top_p() -> f64 {
        0.95
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: String::new(),
            temperature: defaults::temperature(),
            max_tokens: defaults::max_tokens(),
            top_p: defaults::top_p(),
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            enable_vision: false,
            relay_url: None,
        }
    }
}

impl ChatConfig {
    pub fn load() -> Result<ChatConfig, Box<dyn std::error::Error>> {
        let config_path = Self::config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn load_from_path(config_path: &PathBuf) -> Result<ChatConfig, Box<dyn std::error::Error>> {
        if config_path.exists() {
            let contents = fs::read_to_string(config_path)?;
            let config: ChatConfig = toml::from_str(&contents)?;
            Ok(config)
        } else {
            Ok(ChatConfig::default())
        }
    }

    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        let config_path = Self::config_path()?;
        self.save_to_path(&config_path)
    }

    pub fn save_to_path(&self, config_path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)?;
        fs::write(config_path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf, Box<dyn std::error::Error>> {
        let proj_dirs = ProjectDirs::from("org", "permacommons", "trickle")
            .ok_or("Failed to determine config directory")?;
        Ok(proj_dirs.config_dir().join("config.toml"))
    }

    /// Both credential fields must be non-empty before any network call.
    pub fn has_credentials(&self) -> bool {
        !self.api_key.trim().is_empty() && !self.model.trim().is_empty()
    }

    pub fn relay_base_url(&self) -> &str {
        self.relay_url.as_deref().unwrap_or(DEFAULT_RELAY_URL)
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), String> {
        match key {
            "api-key" => self.api_key = value.to_string(),
            "model" => self.model = value.to_string(),
            "relay-url" => self.relay_url = Some(value.to_string()),
            "temperature" => self.temperature = parse_number(key, value)?,
            "max-tokens" => {
                self.max_tokens = value
                    .parse()
                    .map_err(|_| format!("Invalid value for {key}: {value}"))?
            }
            "top-p" => self.top_p = parse_number(key, value)?,
            "frequency-penalty" => self.frequency_penalty = parse_number(key, value)?,
            "presence-penalty" => self.presence_penalty = parse_number(key, value)?,
            "vision" => self.enable_vision = parse_toggle(key, value)?,
            _ => return Err(format!("Unknown configuration key: {key}")),
        }
        Ok(())
    }

    pub fn unset_value(&mut self, key: &str) -> Result<(), String> {
        let defaults = ChatConfig::default();
        match key {
            "api-key" => self.api_key = defaults.api_key,
            "model" => self.model = defaults.model,
            "relay-url" => self.relay_url = None,
            "temperature" => self.temperature = defaults.temperature,
            "max-tokens" => self.max_tokens = defaults.max_tokens,
            "top-p" => self.top_p = defaults.top_p,
            "frequency-penalty" => self.frequency_penalty = defaults.frequency_penalty,
            "presence-penalty" => self.presence_penalty = defaults.presence_penalty,
            "vision" => self.enable_vision = defaults.enable_vision,
            _ => return Err(format!("Unknown configuration key: {key}")),
        }
        Ok(())
    }

    pub fn print_all(&self) {
        println!("Current configuration:");
        match self.api_key.is_empty() {
            true => println!("  api-key: (unset)"),
            false => println!("  api-key: (set)"),
        }
        match self.model.is_empty() {
            true => println!("  model: (unset)"),
            false => println!("  model: {}", self.model),
        }
        match &self.relay_url {
            Some(url) => println!("  relay-url: {url}"),
            None => println!("  relay-url: (unset, using {DEFAULT_RELAY_URL})"),
        }
        println!("  temperature: {}", self.temperature);
        println!("  max-tokens: {}", self.max_tokens);
        println!("  top-p: {}", self.top_p);
        println!("  frequency-penalty: {}", self.frequency_penalty);
        println!("  presence-penalty: {}", self.presence_penalty);
        match self.enable_vision {
            true => println!("  vision: on"),
            false => println!("  vision: off"),
        }
    }
}

fn parse_number(key: &str, value: &str) -> Result<f64, String> {
    value
        .parse()
        .map_err(|_| format!("Invalid value for {key}: {value}"))
}

fn parse_toggle(key: &str, value: &str) -> Result<bool, String> {
    match value {
        "on" | "true" => Ok(true),
        "off" | "false" => Ok(false),
        _ => Err(format!("Invalid value for {key}: {value} (use on/off)")),
    }
}
