use std::{collections::HashSet, fmt, io, path::{Path, PathBuf}, sync::LazyLock};

use fs_err as fs;
use regex::Regex;
use tracing::{debug, info, instrument, warn};

use crate::{error::{CardError, Error}, latex::{Document, NodeKind, find_environments, strip_delimiters}};

pub const FLASHCARD_ENVIRONMENT: &str = "flashcard";
pub const LOG_FILE: &str = "flashcards.log";

/// Derived flashcard files, `card_<id>_front.tex` and `card_<id>_back.tex`.
pub static CARD_FILE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^card_(.+)_(front|back)\.tex$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
	Front,
	Back,
}

impl Side {
	pub fn name(self) -> &'static str {
		match self {
			Side::Front => "front",
			Side::Back => "back",
		}
	}

	pub fn file_name(self, id: &str) -> String { format!("card_{id}_{}.tex", self.name()) }
}

impl fmt::Display for Side {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}

/// One `flashcard` environment pulled out of a note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedCard {
	pub id:    String,
	pub front: String,
	pub back:  String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardReport {
	pub written:   Vec<PathBuf>,
	pub unchanged: usize,
	pub removed:   Vec<PathBuf>,
	pub rejected:  Vec<CardError>,
	pub failed:    Vec<PathBuf>,
}

fn valid_id(id: &str) -> bool {
	!id.is_empty() && !id.chars().any(|c| c == '/' || c == '\\' || c.is_whitespace())
}

/// Extracts every flashcard in document order. Each card succeeds or fails on
/// its own.
pub fn extract(doc: &Document) -> Vec<Result<ExtractedCard, CardError>> {
	let source = doc.source();
	let mut seen = HashSet::new();

	find_environments(doc.root(), source, FLASHCARD_ENVIRONMENT)
		.into_iter()
		.map(|found| {
			let offset = found.environment.start();
			let malformed = |reason| CardError::Malformed { offset, reason };

			let id_node = found.arguments.first().ok_or(malformed("missing [id] argument"))?;
			if id_node.kind() != NodeKind::BrackGroup {
				return Err(malformed("first argument is not an [id]"));
			}
			let front_node = found.arguments.get(1).ok_or(malformed("missing {front} argument"))?;
			if front_node.kind() != NodeKind::CurlyGroup {
				return Err(malformed("second argument is not a {front} group"));
			}

			let id = strip_delimiters(doc.text(id_node)).trim();
			if !valid_id(id) {
				return Err(CardError::InvalidId(id.to_string()));
			}
			if !seen.insert(id.to_string()) {
				return Err(CardError::Duplicate(id.to_string()));
			}

			let body_end = found.environment.as_environment().map_or(offset, |env| env.body_span().end);
			let back_start = front_node.span().end.min(body_end);

			Ok(ExtractedCard {
				id:    id.to_string(),
				front: strip_delimiters(doc.text(front_node)).trim().to_string(),
				back:  source[back_start..body_end].trim().to_string(),
			})
		})
		.collect()
}

/// Wraps one card side into a compilable document using the note's preamble.
pub fn standalone_document(preamble: &str, content: &str) -> String {
	format!("{preamble}\\begin{{document}}\n{content}\n\\end{{document}}")
}

/// Writes `contents` unless the file already holds exactly those bytes.
/// Returns whether a write happened.
pub fn write_if_changed(path: &Path, contents: &str) -> io::Result<bool> {
	match fs::read(path) {
		Ok(existing) if existing == contents.as_bytes() => return Ok(false),
		Ok(_) => {}
		Err(err) if err.kind() == io::ErrorKind::NotFound => {}
		Err(err) => return Err(err),
	}
	fs::write(path, contents)?;
	Ok(true)
}

/// Deletes derived card files in `dir` whose id is not in `keep`. A file that
/// cannot be removed is logged and left in place.
pub fn remove_obsolete(dir: &Path, keep: &HashSet<String>) -> io::Result<Vec<PathBuf>> {
	let mut removed = Vec::new();
	for entry in fs::read_dir(dir)? {
		let entry = entry?;
		let file_name = entry.file_name();
		let Some(name) = file_name.to_str() else { continue };
		let Some(captures) = CARD_FILE.captures(name) else { continue };

		if !keep.contains(&captures[1]) {
			let path = entry.path();
			debug!("Removing obsolete {:?}", path);
			match fs::remove_file(&path) {
				Ok(()) => removed.push(path),
				Err(err) => warn!("Cannot remove {:?}: {}", path, err),
			}
		}
	}
	removed.sort();
	Ok(removed)
}

/// Writes the derived files for every valid card of `doc` into `dir` and
/// removes the ones left over from cards that no longer exist. A file that
/// cannot be written is recorded in the report and the run goes on.
#[instrument(skip(doc))]
pub fn generate(doc: &Document, dir: &Path) -> Result<CardReport, Error> {
	let preamble = doc.preamble().ok_or_else(|| Error::NoDocument(dir.to_path_buf()))?;
	let mut report = CardReport::default();
	let mut keep = HashSet::new();

	for card in extract(doc) {
		let card = match card {
			Ok(card) => card,
			Err(err) => {
				warn!("Skipping flashcard: {}", err);
				report.rejected.push(err);
				continue;
			}
		};

		for (side, content) in [(Side::Front, &card.front), (Side::Back, &card.back)] {
			let path = dir.join(side.file_name(&card.id));
			match write_if_changed(&path, &standalone_document(preamble, content)) {
				Ok(true) => {
					info!("Wrote {:?}", path);
					report.written.push(path);
				}
				Ok(false) => report.unchanged += 1,
				Err(err) => {
					warn!("Cannot write {:?}: {}", path, err);
					report.failed.push(path);
				}
			}
		}
		keep.insert(card.id);
	}

	report.removed = remove_obsolete(dir, &keep)?;
	for path in &report.removed {
		info!("Removed {:?}", path);
	}
	Ok(report)
}

/// Full `cards` run for the zettel stored in `dir`.
pub fn run(dir: &Path) -> Result<CardReport, Error> {
	let doc = crate::read_zettel(dir)?;
	let report = generate(&doc, dir)?;
	info!(
		"{} written, {} unchanged, {} removed, {} rejected, {} failed",
		report.written.len(),
		report.unchanged,
		report.removed.len(),
		report.rejected.len(),
		report.failed.len()
	);
	Ok(report)
}
