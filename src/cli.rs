use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// zettelsync - LaTeX zettel helpers: flashcards, references, Anki sync
///
/// ```bash
/// zettelsync cards -z 20240101        # write card_<id>_{front,back}.tex
/// zettelsync refs -z 20240101         # update the references file
/// zettelsync refs -z 20240101 --query # use $ZETTEL_REFERENCE_QUERY
/// zettelsync sync                     # sync every zettel to Anki
/// zettelsync sync -z a -z b --strict  # only these, fail on LaTeX errors
/// zettelsync tree -z 20240101         # print the syntax tree
/// ```
///
/// Environment: `ANKI_CONNECT_URL`, `ANKI_DECK_NAME`, `ANKI_MODEL_NAME`,
/// `ZETTEL_REFERENCE_QUERY`, `ZETTEL_RESOLVER` (default `xk`).
#[derive(Parser, Debug)]
#[command(name = "zettelsync")]
#[command(version)]
#[command(about = "LaTeX zettel helpers: flashcards, references, Anki sync")]
pub struct Cli {
	/// TOML config file, overridden by the environment
	#[arg(long, global = true, value_name = "PATH")]
	pub config: Option<PathBuf>,

	/// Enable debug logging
	#[arg(short, long, global = true)]
	pub verbose: bool,

	#[command(subcommand)]
	pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
	/// Extract flashcards into standalone card files
	Cards {
		/// Zettel to process
		#[arg(short, long)]
		zettel: String,
	},

	/// Collect and validate the references of a zettel
	Refs {
		/// Zettel to process
		#[arg(short, long)]
		zettel: String,

		/// Use the configured pattern query instead of the reference commands
		#[arg(long)]
		query: bool,
	},

	/// Synchronize derived flashcards with Anki
	Sync {
		/// Only sync these zettels (default: every zettel)
		#[arg(short, long)]
		zettel: Vec<String>,

		/// Fail a card when latexmk reports an error, even if a PDF was produced
		#[arg(long)]
		strict: bool,
	},

	/// Print the parsed syntax tree of a zettel
	Tree {
		/// Zettel to process
		#[arg(short, long)]
		zettel: String,
	},
}
