use std::{collections::BTreeMap, fmt, path::{Path, PathBuf}};

use fs_err as fs;
use tracing::{error, info, instrument, warn};

use crate::{anki::{client::{AnkiClient, CardTemplate, Transport}, local::{Flashcard, fixme_file, scan_flashcards}, render::Renderer}, cards::Side, config::AnkiSettings, error::SyncError, resolver::NoteResolver};

pub const FIELD_FRONT: &str = "front";
pub const FIELD_BACK: &str = "back";
pub const FIELD_ID: &str = "id";
pub const FIELD_HASH: &str = "hash";
pub const FIELD_FIXME: &str = "fixme";
pub const MODEL_FIELDS: [&str; 5] = [FIELD_FRONT, FIELD_BACK, FIELD_ID, FIELD_HASH, FIELD_FIXME];

/// Escapes the characters Anki search treats specially inside a quoted term,
/// `_` and `*` being wildcards.
pub fn escape_search(text: &str) -> String {
	let mut escaped = String::with_capacity(text.len());
	for c in text.chars() {
		if matches!(c, '\\' | '"' | '*' | '_' | ':') {
			escaped.push('\\');
		}
		escaped.push(c);
	}
	escaped
}

/// Search for the card of flashcard `id` in `deck`.
pub fn card_query(deck: &str, id: &str) -> String {
	format!("\"deck:{}\" \"id:{}\"", escape_search(deck), escape_search(id))
}

/// Search for notes in `deck` with a non-empty fixme field.
pub fn fixme_query(deck: &str) -> String { format!("\"deck:{}\" {FIELD_FIXME}:_*", escape_search(deck)) }

pub fn media_name(id: &str, side: Side) -> String { format!("{id}_{side}.svg") }

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
	Created,
	Updated,
	Skipped,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
	pub created: usize,
	pub updated: usize,
	pub skipped: usize,
	pub pending: usize,
	pub failed:  usize,
	pub fixmes:  usize,
}

impl SyncReport {
	fn record(&mut self, outcome: SyncOutcome) {
		match outcome {
			SyncOutcome::Created => self.created += 1,
			SyncOutcome::Updated => self.updated += 1,
			SyncOutcome::Skipped => self.skipped += 1,
		}
	}
}

impl fmt::Display for SyncReport {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"{} created, {} updated, {} skipped, {} pending fix, {} failed, {} fixme(s) collected",
			self.created, self.updated, self.skipped, self.pending, self.failed, self.fixmes
		)
	}
}

/// Reconciles derived flashcards with the notes of one Anki deck.
pub struct Synchronizer<T, R, Z> {
	client:   AnkiClient<T>,
	renderer: R,
	resolver: Z,
	settings: AnkiSettings,
}

impl<T: Transport, R: Renderer, Z: NoteResolver> Synchronizer<T, R, Z> {
	pub fn new(client: AnkiClient<T>, renderer: R, resolver: Z, settings: AnkiSettings) -> Self {
		Self { client, renderer, resolver, settings }
	}

	/// Zettel directory below `kasten` holding the front file of card `id`.
	pub fn find_origin(&self, kasten: &Path, id: &str) -> Result<PathBuf, SyncError> {
		let front = Side::Front.file_name(id);
		let mut candidates = Vec::new();
		for entry in fs::read_dir(kasten)? {
			let path = entry?.path();
			if path.join(&front).is_file() {
				candidates.push(path);
			}
		}
		candidates.sort();
		candidates
			.into_iter()
			.next()
			.ok_or_else(|| SyncError::OriginNotFound { id: id.to_string(), kasten: kasten.to_path_buf() })
	}

	fn store_fixme(&self, kasten: &Path, id: &str, fixme: &str) -> Result<PathBuf, SyncError> {
		let sentinel = self.find_origin(kasten, id)?.join(fixme_file(id));
		fs::write(&sentinel, fixme)?;
		Ok(sentinel)
	}

	/// Writes the fixme of `note` next to its origin card.
	fn write_fixme(&self, kasten: &Path, note: i64) -> Result<(), SyncError> {
		let id = self.client.note_field(note, FIELD_ID)?;
		let fixme = self.client.note_field(note, FIELD_FIXME)?;
		match self.store_fixme(kasten, &id, &fixme) {
			Ok(sentinel) => {
				info!("Stored fixme for card {} in {:?}", id, sentinel);
				Ok(())
			}
			Err(err) => {
				error!("Lost fixme for card {}: {:?}", id, fixme);
				Err(err)
			}
		}
	}

	/// Moves every remote fixme into a local sentinel and deletes the note, so
	/// it is recreated once the sentinel is cleared. The note is deleted even
	/// when the sentinel could not be written.
	#[instrument(skip(self))]
	pub fn collect_fixmes(&self, kasten: &Path) -> Result<usize, SyncError> {
		let notes = self.client.find_notes(&fixme_query(&self.settings.deck))?;
		let mut collected = 0;
		for note in notes {
			match self.write_fixme(kasten, note) {
				Ok(()) => collected += 1,
				Err(err) => warn!("Fixme of note {}: {}", note, err),
			}
			if let Err(err) = self.client.delete_notes(&[note]) {
				warn!("Failed to delete note {}: {}", note, err);
			}
		}
		Ok(collected)
	}

	pub fn ensure_deck(&self) -> Result<(), SyncError> {
		let decks = self.client.deck_names()?;
		if !decks.contains(&self.settings.deck) {
			info!("Creating deck {}", self.settings.deck);
			self.client.create_deck(&self.settings.deck)?;
		}
		Ok(())
	}

	pub fn ensure_model(&self) -> Result<(), SyncError> {
		let models = self.client.model_names()?;
		if !models.contains(&self.settings.model) {
			info!("Creating model {}", self.settings.model);
			let template = CardTemplate {
				name:  "Card 1".to_string(),
				front: format!("{{{{{FIELD_FRONT}}}}}"),
				back:  format!("{{{{{FIELD_BACK}}}}}"),
			};
			self.client.create_model(&self.settings.model, &MODEL_FIELDS, &[template])?;
		}
		Ok(())
	}

	/// Renders one side, stores it as media and returns the field value.
	fn upload(&self, card: &Flashcard, side: Side) -> Result<String, SyncError> {
		let tex = match side {
			Side::Front => &card.front,
			Side::Back => &card.back,
		};
		let data = self.renderer.render(tex)?;
		let stored = self.client.store_media_file(&media_name(&card.id, side), &data)?;
		Ok(format!("<img src=\"{stored}\">"))
	}

	#[instrument(skip(self, card), fields(id = %card.id))]
	pub fn sync_card(&self, card: &Flashcard) -> Result<SyncOutcome, SyncError> {
		let Some(remote) = self.client.find_card(&card_query(&self.settings.deck, &card.id))? else {
			info!("Card {} does not exist, creating it", card.id);
			let fields = BTreeMap::from([
				(FIELD_FRONT, self.upload(card, Side::Front)?),
				(FIELD_BACK, self.upload(card, Side::Back)?),
				(FIELD_ID, card.id.clone()),
				(FIELD_HASH, card.hash.clone()),
				(FIELD_FIXME, String::new()),
			]);
			self.client.add_note(&self.settings.deck, &self.settings.model, &fields)?;
			return Ok(SyncOutcome::Created);
		};

		let note = self.client.card_to_note(remote)?;
		let stored = self.client.note_field(note, FIELD_HASH).unwrap_or_else(|err| {
			warn!("Cannot read hash of note {}: {}, updating", note, err);
			String::new()
		});
		if stored == card.hash {
			info!("Card {} unchanged", card.id);
			return Ok(SyncOutcome::Skipped);
		}

		let fields = BTreeMap::from([
			(FIELD_FRONT, self.upload(card, Side::Front)?),
			(FIELD_BACK, self.upload(card, Side::Back)?),
			(FIELD_HASH, card.hash.clone()),
		]);
		self.client.update_note_fields(note, &fields)?;
		info!("Updated card {}", card.id);
		Ok(SyncOutcome::Updated)
	}

	/// Syncs every card of one zettel. Card failures are logged and counted.
	pub fn sync_zettel(&self, dir: &Path, report: &mut SyncReport) -> Result<(), SyncError> {
		let scan = scan_flashcards(dir)?;
		report.pending += scan.pending.len();
		for card in &scan.cards {
			match self.sync_card(card) {
				Ok(outcome) => report.record(outcome),
				Err(err) => {
					error!("Card {}: {}", card.id, err);
					report.failed += 1;
				}
			}
		}
		Ok(())
	}

	/// Full run. `only` restricts the pass to the given zettels; when empty
	/// every zettel the resolver lists is synced.
	#[instrument(skip(self))]
	pub fn run(&self, only: &[String]) -> Result<SyncReport, SyncError> {
		let kasten = self.resolver.kasten()?;
		let mut report = SyncReport { fixmes: self.collect_fixmes(&kasten)?, ..SyncReport::default() };

		let zettels = if only.is_empty() { self.resolver.list()? } else { only.to_vec() };
		if zettels.is_empty() {
			return Err(SyncError::NoZettels);
		}

		self.ensure_deck()?;
		self.ensure_model()?;

		for zettel in &zettels {
			info!("Processing zettel {}", zettel);
			let dir = match self.resolver.path(zettel) {
				Ok(dir) => dir,
				Err(err) => {
					warn!("Skipping zettel {}: {}", zettel, err);
					continue;
				}
			};
			if let Err(err) = self.sync_zettel(&dir, &mut report) {
				warn!("Skipping zettel {}: {}", zettel, err);
			}
		}

		info!("{}", report);
		Ok(report)
	}
}

#[cfg(test)]
mod tests {
	use std::{cell::RefCell, collections::HashSet};

	use regex::Regex;
	use serde_json::{Value, json};
	use tempfile::TempDir;

	use super::*;
	use crate::{anki::client::Request, error::{AnkiError, RenderError, ResolverError}};

	#[derive(Debug, Clone)]
	struct Note {
		deck:   String,
		fields: BTreeMap<String, String>,
	}

	/// In-memory AnkiConnect. Card ids are note ids plus 1000.
	#[derive(Default)]
	struct FakeAnki {
		decks:   RefCell<Vec<String>>,
		models:  RefCell<Vec<String>>,
		notes:   RefCell<BTreeMap<i64, Note>>,
		media:   RefCell<BTreeMap<String, String>>,
		actions: RefCell<Vec<&'static str>>,
	}

	impl FakeAnki {
		fn with_note(self, id: i64, deck: &str, fields: &[(&str, &str)]) -> Self {
			let fields = fields.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
			self.notes.borrow_mut().insert(id, Note { deck: deck.to_string(), fields });
			self
		}

		fn count(&self, action: &str) -> usize { self.actions.borrow().iter().filter(|a| **a == action).count() }

		fn field(&self, note: i64, field: &str) -> Option<String> {
			self.notes.borrow().get(&note).and_then(|n| n.fields.get(field).cloned())
		}

		/// Value of the `"key:.."` term as an anchored regex, with Anki's `_` and
		/// `*` wildcards and backslash escapes.
		fn term(query: &str, key: &str) -> Result<Regex, String> {
			let start = query.find(&format!("\"{key}:")).ok_or(format!("no {key} term"))? + key.len() + 2;
			let mut pattern = String::from("^");
			let mut chars = query[start..].chars();
			while let Some(c) = chars.next() {
				match c {
					'"' => break,
					'\\' => pattern.push_str(&regex::escape(&chars.next().unwrap_or('\\').to_string())),
					'_' => pattern.push('.'),
					'*' => pattern.push_str(".*"),
					c => pattern.push_str(&regex::escape(&c.to_string())),
				}
			}
			pattern.push('$');
			Regex::new(&pattern).map_err(|e| e.to_string())
		}

		fn handle(&self, request: &Request) -> Result<Value, String> {
			let params = &request.params;
			let ids = |key: &str| -> Vec<i64> {
				params[key].as_array().map(|a| a.iter().filter_map(Value::as_i64).collect()).unwrap_or_default()
			};
			let string_fields = |value: &Value| -> BTreeMap<String, String> {
				value
					.as_object()
					.map(|o| o.iter().map(|(k, v)| (k.clone(), v.as_str().unwrap_or_default().to_string())).collect())
					.unwrap_or_default()
			};

			Ok(match request.action {
				"deckNames" => json!(*self.decks.borrow()),
				"createDeck" => {
					self.decks.borrow_mut().push(params["deck"].as_str().unwrap_or_default().to_string());
					json!(1)
				}
				"modelNames" => json!(*self.models.borrow()),
				"createModel" => {
					self.models.borrow_mut().push(params["modelName"].as_str().unwrap_or_default().to_string());
					json!({})
				}
				"findCards" => {
					let query = params["query"].as_str().unwrap_or_default();
					let (deck, id) = (Self::term(query, "deck")?, Self::term(query, "id")?);
					let cards: Vec<i64> = self
						.notes
						.borrow()
						.iter()
						.filter(|(_, n)| deck.is_match(&n.deck) && n.fields.get("id").is_some_and(|v| id.is_match(v)))
						.map(|(note, _)| note + 1000)
						.collect();
					json!(cards)
				}
				"findNotes" => {
					let query = params["query"].as_str().unwrap_or_default();
					let deck = Self::term(query, "deck")?;
					let notes: Vec<i64> = self
						.notes
						.borrow()
						.iter()
						.filter(|(_, n)| deck.is_match(&n.deck) && n.fields.get("fixme").is_some_and(|f| !f.is_empty()))
						.map(|(note, _)| *note)
						.collect();
					json!(notes)
				}
				"cardsToNotes" => json!(ids("cards").iter().map(|card| card - 1000).collect::<Vec<_>>()),
				"notesInfo" => {
					let notes = self.notes.borrow();
					let infos: Vec<Value> = ids("notes")
						.iter()
						.filter_map(|id| notes.get(id).map(|n| (id, n)))
						.map(|(id, n)| {
							let fields: serde_json::Map<String, Value> =
								n.fields.iter().map(|(k, v)| (k.clone(), json!({ "value": v, "order": 0 }))).collect();
							json!({ "noteId": id, "fields": fields })
						})
						.collect();
					json!(infos)
				}
				"updateNoteFields" => {
					let id = params["note"]["id"].as_i64().unwrap_or_default();
					let mut notes = self.notes.borrow_mut();
					let note = notes.get_mut(&id).ok_or("note was not found")?;
					note.fields.extend(string_fields(&params["note"]["fields"]));
					Value::Null
				}
				"addNote" => {
					let mut notes = self.notes.borrow_mut();
					let id = notes.keys().max().copied().unwrap_or(0) + 1;
					let deck = params["note"]["deckName"].as_str().unwrap_or_default().to_string();
					notes.insert(id, Note { deck, fields: string_fields(&params["note"]["fields"]) });
					json!(id)
				}
				"deleteNotes" => {
					for id in ids("notes") {
						self.notes.borrow_mut().remove(&id);
					}
					Value::Null
				}
				"storeMediaFile" => {
					let name = params["filename"].as_str().unwrap_or_default().to_string();
					let data = params["data"].as_str().unwrap_or_default().to_string();
					self.media.borrow_mut().insert(name.clone(), data);
					json!(name)
				}
				other => return Err(format!("unsupported action {other}")),
			})
		}
	}

	impl Transport for FakeAnki {
		fn send(&self, request: &Request) -> Result<Value, AnkiError> {
			self.actions.borrow_mut().push(request.action);
			Ok(match self.handle(request) {
				Ok(result) => json!({ "result": result, "error": null }),
				Err(error) => json!({ "result": null, "error": error }),
			})
		}
	}

	/// Returns the file contents as the "image"; fails for files it was told to.
	#[derive(Default)]
	struct FakeRenderer {
		broken: HashSet<String>,
	}

	impl Renderer for FakeRenderer {
		fn render(&self, tex: &Path) -> Result<String, RenderError> {
			let name = tex.file_name().and_then(|n| n.to_str()).unwrap_or_default();
			if self.broken.contains(name) {
				return Err(RenderError::Missing(tex.to_path_buf()));
			}
			Ok(std::fs::read_to_string(tex)?)
		}
	}

	/// Kasten on disk with one directory per zettel.
	struct Kasten {
		root: TempDir,
	}

	impl Kasten {
		fn new(zettels: &[&str]) -> Self {
			let root = TempDir::new().unwrap();
			for zettel in zettels {
				std::fs::create_dir(root.path().join(zettel)).unwrap();
			}
			Self { root }
		}

		fn dir(&self, zettel: &str) -> PathBuf { self.root.path().join(zettel) }

		fn card(&self, zettel: &str, id: &str, front: &str, back: &str) {
			std::fs::write(self.dir(zettel).join(Side::Front.file_name(id)), front).unwrap();
			std::fs::write(self.dir(zettel).join(Side::Back.file_name(id)), back).unwrap();
		}
	}

	impl NoteResolver for Kasten {
		fn query(&self, subcommand: &str, flags: &[(&str, &str)]) -> Result<Vec<String>, ResolverError> {
			let root = self.root.path();
			Ok(match (subcommand, flags) {
				("path", []) => vec![root.display().to_string()],
				("path", [(_, zettel)]) => vec![root.join(zettel).display().to_string()],
				_ => {
					let mut names: Vec<String> = std::fs::read_dir(root)
						.unwrap()
						.map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
						.collect();
					names.sort();
					names
				}
			})
		}
	}

	fn settings() -> AnkiSettings {
		AnkiSettings { url: "http://localhost:8765".into(), deck: "Zettel".into(), model: "ZettelCard".into() }
	}

	fn synchronizer<'a>(
		anki: &'a FakeAnki,
		renderer: &'a FakeRenderer,
		kasten: &'a Kasten,
	) -> Synchronizer<&'a FakeAnki, &'a FakeRenderer, &'a Kasten> {
		Synchronizer::new(AnkiClient::new(anki), renderer, kasten, settings())
	}

	fn card(kasten: &Kasten, zettel: &str, id: &str) -> Flashcard {
		scan_flashcards(&kasten.dir(zettel)).unwrap().cards.into_iter().find(|c| c.id == id).unwrap()
	}

	#[test]
	fn queries_are_quoted() {
		assert_eq!(card_query("My Deck", "42"), "\"deck:My Deck\" \"id:42\"");
		assert_eq!(fixme_query("Zettel"), "\"deck:Zettel\" fixme:_*");
		assert_eq!(media_name("42", Side::Back), "42_back.svg");
	}

	#[test]
	fn search_wildcards_are_escaped() {
		assert_eq!(card_query("My_Deck", "ch1_q2"), "\"deck:My\\_Deck\" \"id:ch1\\_q2\"");
		assert_eq!(card_query("D", "a*\"b:c\\"), "\"deck:D\" \"id:a\\*\\\"b\\:c\\\\\"");
		assert_eq!(fixme_query("a_b"), "\"deck:a\\_b\" fixme:_*");
	}

	#[test]
	fn underscore_id_does_not_match_other_cards() {
		let (renderer, kasten) = (FakeRenderer::default(), Kasten::new(&["z1"]));
		kasten.card("z1", "a_1", "Q", "A");
		let local = card(&kasten, "z1", "a_1");
		let anki = FakeAnki::default().with_note(5, "Zettel", &[("id", "ab1"), ("hash", "other"), ("fixme", "")]);

		let outcome = synchronizer(&anki, &renderer, &kasten).sync_card(&local).unwrap();
		assert_eq!(outcome, SyncOutcome::Created);
		assert_eq!(anki.field(5, "hash").as_deref(), Some("other"));
		assert_eq!(anki.field(6, "id").as_deref(), Some("a_1"));
	}

	#[test]
	fn missing_card_is_created() {
		let (anki, renderer, kasten) = (FakeAnki::default(), FakeRenderer::default(), Kasten::new(&["z1"]));
		kasten.card("z1", "42", "What is 2+2?", "4");
		let local = card(&kasten, "z1", "42");

		let outcome = synchronizer(&anki, &renderer, &kasten).sync_card(&local).unwrap();
		assert_eq!(outcome, SyncOutcome::Created);
		assert_eq!(anki.field(1, "id").as_deref(), Some("42"));
		assert_eq!(anki.field(1, "hash"), Some(local.hash.clone()));
		assert_eq!(anki.field(1, "front").as_deref(), Some("<img src=\"42_front.svg\">"));
		assert_eq!(anki.field(1, "fixme").as_deref(), Some(""));
		assert_eq!(anki.media.borrow().get("42_back.svg").map(String::as_str), Some("4"));
	}

	#[test]
	fn matching_hash_skips_the_update() {
		let (renderer, kasten) = (FakeRenderer::default(), Kasten::new(&["z1"]));
		kasten.card("z1", "7", "Q", "A");
		let local = card(&kasten, "z1", "7");
		let anki = FakeAnki::default().with_note(5, "Zettel", &[("id", "7"), ("hash", local.hash.as_str()), ("fixme", "")]);

		let outcome = synchronizer(&anki, &renderer, &kasten).sync_card(&local).unwrap();
		assert_eq!(outcome, SyncOutcome::Skipped);
		assert_eq!(anki.count("updateNoteFields"), 0);
		assert_eq!(anki.count("storeMediaFile"), 0);
	}

	#[test]
	fn changed_hash_updates_the_note() {
		let (renderer, kasten) = (FakeRenderer::default(), Kasten::new(&["z1"]));
		kasten.card("z1", "7", "Q", "new answer");
		let local = card(&kasten, "z1", "7");
		let anki = FakeAnki::default().with_note(5, "Zettel", &[("id", "7"), ("hash", "stale"), ("fixme", "")]);

		let outcome = synchronizer(&anki, &renderer, &kasten).sync_card(&local).unwrap();
		assert_eq!(outcome, SyncOutcome::Updated);
		assert_eq!(anki.field(5, "hash"), Some(local.hash));
		assert_eq!(anki.field(5, "id").as_deref(), Some("7"));
		assert_eq!(anki.count("addNote"), 0);
	}

	#[test]
	fn unreadable_hash_forces_an_update() {
		let (renderer, kasten) = (FakeRenderer::default(), Kasten::new(&["z1"]));
		kasten.card("z1", "7", "Q", "A");
		let local = card(&kasten, "z1", "7");
		let anki = FakeAnki::default().with_note(5, "Zettel", &[("id", "7")]);

		let outcome = synchronizer(&anki, &renderer, &kasten).sync_card(&local).unwrap();
		assert_eq!(outcome, SyncOutcome::Updated);
	}

	#[test]
	fn render_failure_does_not_stop_the_batch() {
		let kasten = Kasten::new(&["z1"]);
		kasten.card("z1", "a", "Qa", "Aa");
		kasten.card("z1", "b", "Qb", "Ab");
		let renderer = FakeRenderer { broken: HashSet::from(["card_a_back.tex".to_string()]) };
		let anki = FakeAnki::default();

		let mut report = SyncReport::default();
		synchronizer(&anki, &renderer, &kasten).sync_zettel(&kasten.dir("z1"), &mut report).unwrap();
		assert_eq!(report.failed, 1);
		assert_eq!(report.created, 1);
		assert_eq!(anki.notes.borrow().len(), 1);
	}

	#[test]
	fn fixme_round_trip() {
		let (renderer, kasten) = (FakeRenderer::default(), Kasten::new(&["z1", "z2"]));
		kasten.card("z2", "9", "Q", "A");
		let anki = FakeAnki::default().with_note(3, "Zettel", &[("id", "9"), ("hash", "h"), ("fixme", "typo in answer")]);
		anki.decks.borrow_mut().push("Zettel".into());
		anki.models.borrow_mut().push("ZettelCard".into());

		let report = synchronizer(&anki, &renderer, &kasten).run(&[]).unwrap();
		assert_eq!(report.fixmes, 1);
		assert_eq!(report.pending, 1);
		assert_eq!(report.created, 0);
		assert_eq!(std::fs::read_to_string(kasten.dir("z2").join("fix_9")).unwrap(), "typo in answer");
		assert!(anki.notes.borrow().is_empty());

		let scan = scan_flashcards(&kasten.dir("z2")).unwrap();
		assert!(scan.cards.is_empty());
	}

	#[test]
	fn fixme_without_origin_still_deletes_the_note() {
		let (renderer, kasten) = (FakeRenderer::default(), Kasten::new(&["z1"]));
		let anki = FakeAnki::default().with_note(3, "Zettel", &[("id", "gone"), ("fixme", "x")]);

		let collected = synchronizer(&anki, &renderer, &kasten).collect_fixmes(kasten.root.path()).unwrap();
		assert_eq!(collected, 0);
		assert!(anki.notes.borrow().is_empty());
	}

	#[test]
	fn run_creates_deck_and_model() {
		let (anki, renderer, kasten) = (FakeAnki::default(), FakeRenderer::default(), Kasten::new(&["z1"]));
		kasten.card("z1", "1", "Q", "A");

		let report = synchronizer(&anki, &renderer, &kasten).run(&[]).unwrap();
		assert_eq!(report.created, 1);
		assert_eq!(*anki.decks.borrow(), vec!["Zettel"]);
		assert_eq!(*anki.models.borrow(), vec!["ZettelCard"]);

		let again = synchronizer(&anki, &renderer, &kasten).run(&["z1".to_string()]).unwrap();
		assert_eq!(again.skipped, 1);
		assert_eq!(anki.count("createDeck"), 1);
	}

	#[test]
	fn empty_kasten_is_fatal() {
		let (anki, renderer, kasten) = (FakeAnki::default(), FakeRenderer::default(), Kasten::new(&[]));
		assert!(matches!(synchronizer(&anki, &renderer, &kasten).run(&[]), Err(SyncError::NoZettels)));
	}
}
