use std::{collections::BTreeMap, io, path::{Path, PathBuf}};

use fs_err as fs;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::cards::{CARD_FILE, Side};

/// Name of the sentinel file that holds a fixme for card `id`.
pub fn fixme_file(id: &str) -> String { format!("fix_{id}") }

/// A pair of derived card files found in a zettel directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flashcard {
	pub id:    String,
	pub front: PathBuf,
	pub back:  PathBuf,
	pub hash:  String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalScan {
	pub cards:   Vec<Flashcard>,
	/// Ids held back by a fixme sentinel.
	pub pending: Vec<String>,
}

/// Change detector over the front bytes followed by the back bytes.
pub fn content_hash(front: &[u8], back: &[u8]) -> String {
	let mut hasher = Sha256::new();
	hasher.update(front);
	hasher.update(back);
	hex::encode(hasher.finalize())
}

#[derive(Default)]
struct Pair {
	front: Option<PathBuf>,
	back:  Option<PathBuf>,
}

/// Collects the flashcards of one zettel directory, ordered by id.
pub fn scan_flashcards(dir: &Path) -> io::Result<LocalScan> {
	let mut pairs: BTreeMap<String, Pair> = BTreeMap::new();
	for entry in fs::read_dir(dir)? {
		let entry = entry?;
		let file_name = entry.file_name();
		let Some(name) = file_name.to_str() else { continue };
		let Some(captures) = CARD_FILE.captures(name) else { continue };

		let pair = pairs.entry(captures[1].to_string()).or_default();
		if &captures[2] == Side::Front.name() {
			pair.front = Some(entry.path());
		} else {
			pair.back = Some(entry.path());
		}
	}

	let mut scan = LocalScan::default();
	for (id, pair) in pairs {
		let Some(front) = pair.front else { continue };
		if dir.join(fixme_file(&id)).exists() {
			debug!("Card {} must be fixed, not syncing", id);
			scan.pending.push(id);
			continue;
		}
		let Some(back) = pair.back else {
			warn!("Missing back file for card {}, skipping", id);
			continue;
		};

		let contents = fs::read(&front).and_then(|bytes| Ok((bytes, fs::read(&back)?)));
		match contents {
			Ok((front_bytes, back_bytes)) => {
				let hash = content_hash(&front_bytes, &back_bytes);
				scan.cards.push(Flashcard { id, front, back, hash });
			}
			Err(err) => warn!("Cannot read card {}: {}, skipping", id, err),
		}
	}
	Ok(scan)
}
