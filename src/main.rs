use std::{path::Path, process::ExitCode};

use clap::Parser;
use eyre::Result;
use tracing::{error, info};
use zettelsync::{Cli, Command, anki::{AnkiClient, HttpTransport, LatexPipeline, Synchronizer}, cards, config::Config, logging, read_zettel, refs::{self, ReferenceSource}, resolver::{NoteResolver, Xk}};

/// Truncates the per-zettel log and sends all further logging to it.
fn log_to(path: &Path, config: &Config, verbose: bool) -> Result<()> {
	logging::truncate_log(path, config.log_max_lines())?;
	logging::init_file_logging(path, verbose)?;
	Ok(())
}

fn run(cli: Cli) -> Result<()> {
	let config = Config::load(cli.config.as_deref())?;
	let resolver = Xk::new(config.resolver());

	match cli.command {
		Command::Cards { zettel } => {
			let dir = resolver.path(&zettel)?;
			log_to(&dir.join(cards::LOG_FILE), &config, cli.verbose)?;
			info!("Generating flashcards for {}", zettel);
			cards::run(&dir)?;
		}
		Command::Refs { zettel, query } => {
			let query = if query { Some(refs::compile_query(config.reference_query()?)?) } else { None };
			let commands = config.reference_commands();
			let from = match &query {
				Some(query) => ReferenceSource::Query(query),
				None => ReferenceSource::Commands(&commands),
			};

			let dir = resolver.path(&zettel)?;
			log_to(&dir.join(refs::LOG_FILE), &config, cli.verbose)?;
			info!("Collecting references of {}", zettel);
			refs::run(&resolver, &dir, from)?;
		}
		Command::Sync { zettel, strict } => {
			logging::init_stderr_logging(cli.verbose);
			let settings = config.anki()?;
			let client = AnkiClient::new(HttpTransport::new(&settings.url));
			let synchronizer = Synchronizer::new(client, LatexPipeline { force: !strict, ..LatexPipeline::default() }, resolver, settings);
			synchronizer.run(&zettel)?;
		}
		Command::Tree { zettel } => {
			logging::init_stderr_logging(cli.verbose);
			let dir = resolver.path(&zettel)?;
			print!("{}", read_zettel(&dir)?.dump());
		}
	}
	Ok(())
}

fn main() -> ExitCode {
	if let Err(err) = color_eyre::install() {
		eprintln!("Failed to install error handler: {err}");
	}

	match run(Cli::parse()) {
		Ok(()) => ExitCode::SUCCESS,
		Err(report) => {
			error!("{:#}", report);
			eprintln!("Error: {report:?}");
			ExitCode::FAILURE
		}
	}
}
