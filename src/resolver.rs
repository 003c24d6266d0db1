use std::{path::PathBuf, process::Command};

use tracing::{debug, instrument};

use crate::error::ResolverError;

/// The external note-path resolver. Given a subcommand and `-key value` flag
/// pairs it prints one path or identifier per line.
pub trait NoteResolver {
	fn query(&self, subcommand: &str, flags: &[(&str, &str)]) -> Result<Vec<String>, ResolverError>;

	/// Directory of a single zettel (first line of `path -z <zettel>`).
	fn path(&self, zettel: &str) -> Result<PathBuf, ResolverError> {
		self
			.query("path", &[("z", zettel)])?
			.into_iter()
			.next()
			.map(PathBuf::from)
			.ok_or_else(|| ResolverError::NotFound(zettel.to_string()))
	}

	/// Root directory of the whole note collection (`path` without flags).
	fn kasten(&self) -> Result<PathBuf, ResolverError> {
		self
			.query("path", &[])?
			.into_iter()
			.next()
			.map(PathBuf::from)
			.ok_or_else(|| ResolverError::NotFound(String::new()))
	}

	/// Every zettel identifier (`ls`).
	fn list(&self) -> Result<Vec<String>, ResolverError> { self.query("ls", &[]) }
}

impl<T: NoteResolver + ?Sized> NoteResolver for &T {
	fn query(&self, subcommand: &str, flags: &[(&str, &str)]) -> Result<Vec<String>, ResolverError> {
		(**self).query(subcommand, flags)
	}
}

/// Resolver backed by a command-line program, `xk` unless configured otherwise.
#[derive(Debug, Clone)]
pub struct Xk {
	program: String,
}

impl Xk {
	pub fn new(program: impl Into<String>) -> Self { Self { program: program.into() } }
}

impl NoteResolver for Xk {
	#[instrument(skip(self), fields(program = %self.program))]
	fn query(&self, subcommand: &str, flags: &[(&str, &str)]) -> Result<Vec<String>, ResolverError> {
		let mut command = Command::new(&self.program);
		command.arg(subcommand);
		for (key, value) in flags {
			command.arg(format!("-{key}")).arg(value);
		}

		let output = command
			.output()
			.map_err(|source| ResolverError::Spawn { program: self.program.clone(), source })?;

		if !output.status.success() {
			let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
			combined.push_str(&String::from_utf8_lossy(&output.stderr));
			return Err(ResolverError::Failed {
				program:    self.program.clone(),
				subcommand: subcommand.to_string(),
				status:     output.status,
				output:     combined.trim().to_string(),
			});
		}

		let lines: Vec<String> = String::from_utf8_lossy(&output.stdout)
			.lines()
			.map(str::trim)
			.filter(|line| !line.is_empty())
			.map(str::to_string)
			.collect();
		debug!("{} line(s) from {} {}", lines.len(), self.program, subcommand);
		Ok(lines)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[cfg(unix)]
	#[test]
	fn flags_are_passed_as_key_value_pairs() {
		// `echo` prints its arguments, which stands in for a resolver here
		let echo = Xk::new("echo");
		let lines = echo.query("path", &[("z", "my note")]).unwrap();
		assert_eq!(lines, vec!["path -z my note"]);
		assert_eq!(echo.path("abc").unwrap(), PathBuf::from("path -z abc"));
	}

	#[cfg(unix)]
	#[test]
	fn non_zero_exit_is_an_error() {
		let err = Xk::new("false").query("ls", &[]).unwrap_err();
		assert!(matches!(err, ResolverError::Failed { .. }));
	}

	#[test]
	fn missing_program_is_a_spawn_error() {
		let err = Xk::new("zettelsync-no-such-resolver").list().unwrap_err();
		assert!(matches!(err, ResolverError::Spawn { .. }));
	}

	struct Empty;

	impl NoteResolver for Empty {
		fn query(&self, _: &str, _: &[(&str, &str)]) -> Result<Vec<String>, ResolverError> { Ok(vec![]) }
	}

	#[test]
	fn empty_output_means_not_found() {
		assert!(matches!(Empty.path("x"), Err(ResolverError::NotFound(z)) if z == "x"));
		assert!(Empty.kasten().is_err());
	}
}
