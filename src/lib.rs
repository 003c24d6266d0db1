use std::path::Path;

use fs_err as fs;
use tracing::{debug, instrument};

use crate::{error::Error, latex::Document};

pub mod anki;
pub mod cards;
pub mod cli;
pub mod config;
pub mod error;
pub mod latex;
pub mod logging;
pub mod refs;
pub mod resolver;

pub use cli::{Cli, Command};

/// Source file of every zettel, relative to its directory.
pub const ZETTEL_SOURCE: &str = "zettel.tex";

/// Reads and parses the source of the zettel stored in `dir`.
#[instrument]
pub fn read_zettel(dir: &Path) -> Result<Document, Error> {
	let path = dir.join(ZETTEL_SOURCE);
	let source = fs::read_to_string(&path)?;
	debug!("Read {} bytes from {:?}", source.len(), path);
	Ok(Document::parse(source))
}
