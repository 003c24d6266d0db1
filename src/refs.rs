use std::{collections::BTreeSet, io::Write, path::{Path, PathBuf}, process::Command};

use fs_err as fs;
use tempfile::NamedTempFile;
use tracing::{debug, info, instrument, warn};

use crate::{error::{Error, QueryError, ReferenceError}, latex::{Document, Query, find_commands, strip_delimiters}, resolver::NoteResolver};

pub const REFERENCE_FILE: &str = "references";
pub const LOG_FILE: &str = "references.log";
pub const REFERENCE_CAPTURE: &str = "ref";

/// How references are located in a note.
#[derive(Debug, Clone, Copy)]
pub enum ReferenceSource<'a> {
	/// First curly argument of each of these commands.
	Commands(&'a [String]),
	/// Every `@ref` capture of a pattern query.
	Query(&'a Query),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceReport {
	pub references: BTreeSet<String>,
	pub dropped:    Vec<String>,
	pub diff:       Option<String>,
}

/// Compiles a reference query, which must capture `@ref`.
pub fn compile_query(source: &str) -> Result<Query, QueryError> {
	let query = Query::new(source)?;
	if !query.has_capture(REFERENCE_CAPTURE) {
		return Err(QueryError::MissingCapture(REFERENCE_CAPTURE));
	}
	Ok(query)
}

/// Candidate references in document order, commands taken one after another.
pub fn extract(doc: &Document, from: ReferenceSource<'_>) -> Vec<String> {
	let mut found = Vec::new();
	match from {
		ReferenceSource::Commands(commands) => {
			for command in commands {
				for result in find_commands(doc.root(), doc.source(), command) {
					match result {
						Ok(found_command) => found.push(doc.text(found_command.argument)),
						Err(err) => warn!("{}", err),
					}
				}
			}
		}
		ReferenceSource::Query(query) => {
			for matched in query.matches(doc.root(), doc.source()) {
				found.extend(matched.nodes(REFERENCE_CAPTURE).map(|node| doc.text(node)));
			}
		}
	}

	found
		.into_iter()
		.map(|text| strip_delimiters(text).trim())
		.filter(|reference| !reference.is_empty())
		.map(str::to_string)
		.collect()
}

/// Keeps the references the resolver knows about, sorted and deduplicated.
/// Returns the kept set and the dropped references.
pub fn validate<R: NoteResolver>(resolver: &R, candidates: Vec<String>) -> (BTreeSet<String>, Vec<String>) {
	let mut kept = BTreeSet::new();
	let mut dropped = Vec::new();

	for reference in candidates {
		if kept.contains(&reference) {
			continue;
		}
		match resolver.path(&reference) {
			Ok(path) => {
				debug!("{} -> {:?}", reference, path);
				kept.insert(reference);
			}
			Err(err) => {
				warn!("Dropping reference '{}': {}", reference, err);
				dropped.push(reference);
			}
		}
	}
	(kept, dropped)
}

/// One reference per line.
pub fn render(references: &BTreeSet<String>) -> String {
	references.iter().map(|reference| format!("{reference}\n")).collect()
}

/// Runs `diff -u old new`. `None` means the files are identical.
fn unified_diff(old: &Path, new: &Path) -> Result<Option<String>, ReferenceError> {
	let output = Command::new("diff")
		.arg("-u")
		.arg(old)
		.arg(new)
		.output()
		.map_err(ReferenceError::DiffSpawn)?;

	match output.status.code() {
		Some(0) => Ok(None),
		Some(1) => Ok(Some(String::from_utf8_lossy(&output.stdout).into_owned())),
		_ => Err(ReferenceError::Diff {
			status: output.status,
			output: String::from_utf8_lossy(&output.stderr).trim().to_string(),
		}),
	}
}

/// Logs the difference to the stored list, then overwrites it.
#[instrument(skip(references))]
pub fn persist(path: &Path, references: &BTreeSet<String>) -> Result<Option<String>, ReferenceError> {
	if !path.exists() {
		debug!("Creating {:?}", path);
		fs::write(path, "")?;
	}

	let contents = render(references);
	let mut staged = NamedTempFile::new()?;
	staged.write_all(contents.as_bytes())?;
	staged.flush()?;

	let diff = unified_diff(path, staged.path())?;
	match &diff {
		Some(diff) => info!("References changed:\n{}", diff),
		None => info!("References unchanged"),
	}

	fs::write(path, contents)?;
	Ok(diff)
}

pub fn reference_file(dir: &Path) -> PathBuf { dir.join(REFERENCE_FILE) }

/// Full `refs` run for the zettel stored in `dir`.
pub fn run<R: NoteResolver>(resolver: &R, dir: &Path, from: ReferenceSource<'_>) -> Result<ReferenceReport, Error> {
	let doc = crate::read_zettel(dir)?;
	let (references, dropped) = validate(resolver, extract(&doc, from));
	info!("{} reference(s), {} dropped", references.len(), dropped.len());

	let diff = persist(&reference_file(dir), &references)?;
	Ok(ReferenceReport { references, dropped, diff })
}

#[cfg(test)]
mod tests {
	use std::collections::HashSet;

	use tempfile::TempDir;

	use super::*;
	use crate::error::ResolverError;

	struct Known(HashSet<&'static str>);

	impl NoteResolver for Known {
		fn query(&self, _: &str, flags: &[(&str, &str)]) -> Result<Vec<String>, ResolverError> {
			let zettel = flags.first().map(|(_, z)| *z).unwrap_or_default();
			Ok(if self.0.contains(zettel) { vec![format!("/kasten/{zettel}")] } else { vec![] })
		}
	}

	fn known(names: &[&'static str]) -> Known { Known(names.iter().copied().collect()) }

	fn commands() -> Vec<String> { vec!["zref".into(), "zinc".into()] }

	#[test]
	fn fixed_commands_in_order() {
		let doc = Document::parse("\\zinc{c} \\zref{b} \\zref{} \\zref \\zref{ a }");
		assert_eq!(extract(&doc, ReferenceSource::Commands(&commands())), vec!["b", "a", "c"]);
	}

	#[test]
	fn query_captures_ref() {
		let query = compile_query(
			"((generic_command command: (command_name) @cmd arg: (curly_group) @ref) (#eq? @cmd \"\\\\cite\"))",
		)
		.unwrap();
		let doc = Document::parse("\\cite{x} \\zref{y} \\cite[p]{z}");
		assert_eq!(extract(&doc, ReferenceSource::Query(&query)), vec!["x", "z"]);
	}

	#[test]
	fn query_without_ref_capture_is_rejected() {
		assert!(matches!(compile_query("(generic_command) @cmd"), Err(QueryError::MissingCapture("ref"))));
	}

	#[test]
	fn unresolvable_references_are_dropped() {
		let (kept, dropped) =
			validate(&known(&["b", "a"]), vec!["b".into(), "ghost".into(), "a".into(), "b".into()]);
		assert_eq!(kept.into_iter().collect::<Vec<_>>(), vec!["a", "b"]);
		assert_eq!(dropped, vec!["ghost"]);
	}

	#[test]
	fn sorting_is_case_sensitive() {
		let (kept, _) = validate(&known(&["b", "B", "a"]), vec!["b".into(), "a".into(), "B".into()]);
		assert_eq!(render(&kept), "B\na\nb\n");
	}

	#[cfg(unix)]
	#[test]
	fn rerun_leaves_an_identical_file() {
		let dir = TempDir::new().unwrap();
		std::fs::write(dir.path().join("zettel.tex"), "\\begin{document}\\zref{b}\\zinc{a}\\zref{nope}\\end{document}")
			.unwrap();
		let resolver = known(&["a", "b"]);
		let commands = commands();

		let first = run(&resolver, dir.path(), ReferenceSource::Commands(&commands)).unwrap();
		assert!(first.diff.is_some());
		assert_eq!(first.dropped, vec!["nope"]);
		let stored = std::fs::read(dir.path().join(REFERENCE_FILE)).unwrap();
		assert_eq!(stored, b"a\nb\n");

		let second = run(&resolver, dir.path(), ReferenceSource::Commands(&commands)).unwrap();
		assert_eq!(second.diff, None);
		assert_eq!(std::fs::read(dir.path().join(REFERENCE_FILE)).unwrap(), stored);
	}
}
