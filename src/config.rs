use std::path::Path;

use fs_err as fs;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::error::ConfigError;

pub const ENV_ANKI_URL: &str = "ANKI_CONNECT_URL";
pub const ENV_ANKI_DECK: &str = "ANKI_DECK_NAME";
pub const ENV_ANKI_MODEL: &str = "ANKI_MODEL_NAME";
pub const ENV_REFERENCE_QUERY: &str = "ZETTEL_REFERENCE_QUERY";
pub const ENV_RESOLVER: &str = "ZETTEL_RESOLVER";

pub const DEFAULT_RESOLVER: &str = "xk";
pub const DEFAULT_LOG_MAX_LINES: usize = 100;
pub const DEFAULT_REFERENCE_COMMANDS: &[&str] = &["zref", "zinc"];

#[derive(Deserialize, Clone, PartialEq, Debug, Default)]
pub struct AnkiSection {
	pub url:   Option<String>,
	pub deck:  Option<String>,
	pub model: Option<String>,
}

#[derive(Deserialize, Clone, PartialEq, Debug, Default)]
pub struct ReferenceSection {
	pub query:    Option<String>,
	pub commands: Option<Vec<String>>,
}

/// Settings for one run. Loaded from an optional TOML file, then overlaid with
/// the process environment.
#[derive(Deserialize, Clone, PartialEq, Debug, Default)]
pub struct Config {
	#[serde(default)]
	pub anki:          AnkiSection,
	#[serde(default)]
	pub references:    ReferenceSection,
	pub resolver:      Option<String>,
	pub log_max_lines: Option<usize>,
}

/// The validated AnkiConnect settings the synchronizer is built with.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct AnkiSettings {
	pub url:   String,
	pub deck:  String,
	pub model: String,
}

impl Config {
	#[instrument]
	pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
		let mut config = match path {
			Some(path) => {
				debug!("Loading config from {:?}", path);
				toml::from_str(&fs::read_to_string(path)?)?
			}
			None => Config::default(),
		};
		config.apply_env(|key| std::env::var(key).ok());
		Ok(config)
	}

	/// Environment values win over the file. Empty values count as unset.
	pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
		let get = |key: &str| lookup(key).filter(|value| !value.is_empty());

		if let Some(url) = get(ENV_ANKI_URL) {
			self.anki.url = Some(url);
		}
		if let Some(deck) = get(ENV_ANKI_DECK) {
			self.anki.deck = Some(deck);
		}
		if let Some(model) = get(ENV_ANKI_MODEL) {
			self.anki.model = Some(model);
		}
		if let Some(query) = get(ENV_REFERENCE_QUERY) {
			self.references.query = Some(query);
		}
		if let Some(resolver) = get(ENV_RESOLVER) {
			self.resolver = Some(resolver);
		}
	}

	pub fn anki(&self) -> Result<AnkiSettings, ConfigError> {
		Ok(AnkiSettings {
			url:   self.anki.url.clone().ok_or(ConfigError::Missing(ENV_ANKI_URL))?,
			deck:  self.anki.deck.clone().ok_or(ConfigError::Missing(ENV_ANKI_DECK))?,
			model: self.anki.model.clone().ok_or(ConfigError::Missing(ENV_ANKI_MODEL))?,
		})
	}

	pub fn reference_query(&self) -> Result<&str, ConfigError> {
		self.references.query.as_deref().ok_or(ConfigError::Missing(ENV_REFERENCE_QUERY))
	}

	pub fn reference_commands(&self) -> Vec<String> {
		match &self.references.commands {
			Some(commands) if !commands.is_empty() => commands.clone(),
			_ => DEFAULT_REFERENCE_COMMANDS.iter().map(|c| c.to_string()).collect(),
		}
	}

	pub fn resolver(&self) -> &str { self.resolver.as_deref().unwrap_or(DEFAULT_RESOLVER) }

	pub fn log_max_lines(&self) -> usize { self.log_max_lines.unwrap_or(DEFAULT_LOG_MAX_LINES) }
}
