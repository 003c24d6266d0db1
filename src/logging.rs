use std::{io, path::Path, sync::Mutex};

use fs_err::{self as fs, OpenOptions};
use tracing::{Level, debug};
use tracing_subscriber::fmt::time::ChronoLocal;

const TIME_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

fn level(verbose: bool) -> Level { if verbose { Level::DEBUG } else { Level::INFO } }

/// Keeps only the last `max_lines` lines of the log at `path`. A missing file
/// is left alone.
pub fn truncate_log(path: &Path, max_lines: usize) -> io::Result<()> {
	let contents = match fs::read_to_string(path) {
		Ok(contents) => contents,
		Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
		Err(err) => return Err(err),
	};

	let lines: Vec<&str> = contents.lines().collect();
	if lines.len() <= max_lines {
		return Ok(());
	}

	let mut kept = lines[lines.len() - max_lines..].join("\n");
	if !kept.is_empty() {
		kept.push('\n');
	}
	fs::write(path, kept)
}

fn installed(result: Result<(), impl std::fmt::Display>) -> bool {
	match result {
		Ok(()) => true,
		Err(err) => {
			debug!("Keeping the installed subscriber: {}", err);
			false
		}
	}
}

/// Appends log lines to `path`, creating it if needed. A subscriber that is
/// already installed is kept; returns whether this one was installed.
pub fn init_file_logging(path: &Path, verbose: bool) -> io::Result<bool> {
	let file = OpenOptions::new().create(true).append(true).open(path)?;

	let result = tracing_subscriber::fmt()
		.with_max_level(level(verbose))
		.with_timer(ChronoLocal::new(TIME_FORMAT.to_string()))
		.with_ansi(false)
		.with_target(false)
		.with_writer(Mutex::new(file))
		.try_init();
	Ok(installed(result))
}

pub fn init_stderr_logging(verbose: bool) -> bool {
	let result = tracing_subscriber::fmt()
		.with_max_level(level(verbose))
		.with_timer(ChronoLocal::new(TIME_FORMAT.to_string()))
		.with_target(false)
		.with_writer(io::stderr)
		.try_init();
	installed(result)
}
