use std::{io, path::PathBuf, process::ExitStatus};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("Missing required setting '{0}'")]
	Missing(&'static str),

	#[error("Failed to read config file: {0}")]
	Io(#[from] io::Error),

	#[error("Invalid config file: {0}")]
	Toml(#[from] toml::de::Error),
}

#[derive(Debug, Error)]
pub enum ResolverError {
	#[error("Failed to run '{program}': {source}")]
	Spawn { program: String, source: io::Error },

	#[error("'{program} {subcommand}' exited with {status}, output: {output}")]
	Failed { program: String, subcommand: String, status: ExitStatus, output: String },

	#[error("No path returned for zettel '{0}'")]
	NotFound(String),
}

#[derive(Debug, Error)]
pub enum QueryError {
	#[error("Invalid query:\n{0}")]
	Syntax(String),

	#[error("Unknown predicate '#{0}'")]
	UnknownPredicate(String),

	#[error("Predicate '#{name}' expects {expected}")]
	Arity { name: String, expected: &'static str },

	#[error("Predicate refers to unknown capture '@{0}'")]
	UnknownCapture(String),

	#[error("Invalid regular expression: {0}")]
	Regex(#[from] regex::Error),

	#[error("Query does not define the '@{0}' capture")]
	MissingCapture(&'static str),
}

/// Soft per-match error of the syntax query layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
	#[error("\\{command} at byte {offset} has no argument group")]
	MissingArgument { command: String, offset: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CardError {
	#[error("Flashcard at byte {offset} is malformed: {reason}")]
	Malformed { offset: usize, reason: &'static str },

	#[error("Flashcard id '{0}' is not usable as a file name")]
	InvalidId(String),

	#[error("Flashcard id '{0}' is used more than once")]
	Duplicate(String),
}

#[derive(Debug, Error)]
pub enum ReferenceError {
	#[error("Failed to run diff: {0}")]
	DiffSpawn(io::Error),

	#[error("diff exited with {status}: {output}")]
	Diff { status: ExitStatus, output: String },

	#[error(transparent)]
	Io(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum RenderError {
	#[error("Failed to run {tool}: {source}")]
	Spawn { tool: &'static str, source: io::Error },

	#[error("{tool} exited with {status}")]
	Tool { tool: &'static str, status: ExitStatus },

	#[error("{0:?} was not generated")]
	Missing(PathBuf),

	#[error(transparent)]
	Io(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum AnkiError {
	#[error("HTTP request failed: {0}")]
	Http(#[from] reqwest::Error),

	#[error("Request failed with status code: {0}")]
	Status(u16),

	#[error("AnkiConnect error: {0}")]
	Api(String),

	#[error("Unexpected response: {0}")]
	Decode(#[from] serde_json::Error),

	#[error("Expected {expected} result(s) for {action}, got {found}")]
	Count { action: &'static str, expected: &'static str, found: usize },

	#[error("Note {note} has no field '{field}'")]
	MissingField { note: i64, field: String },

	#[error("Invalid request: {0}")]
	InvalidInput(&'static str),
}

#[derive(Debug, Error)]
pub enum SyncError {
	#[error(transparent)]
	Anki(#[from] AnkiError),

	#[error(transparent)]
	Render(#[from] RenderError),

	#[error(transparent)]
	Resolver(#[from] ResolverError),

	#[error("No flashcard file for card '{id}' below {kasten:?}")]
	OriginNotFound { id: String, kasten: PathBuf },

	#[error("The resolver listed no zettels")]
	NoZettels,

	#[error(transparent)]
	Io(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum Error {
	#[error(transparent)]
	Config(#[from] ConfigError),

	#[error(transparent)]
	Resolver(#[from] ResolverError),

	#[error(transparent)]
	Query(#[from] QueryError),

	#[error(transparent)]
	Reference(#[from] ReferenceError),

	#[error(transparent)]
	Sync(#[from] SyncError),

	#[error("No document environment found in {0:?}")]
	NoDocument(PathBuf),

	#[error(transparent)]
	Io(#[from] io::Error),
}
