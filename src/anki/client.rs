//! Typed AnkiConnect client.

use std::collections::{BTreeMap, HashMap};

use reqwest::{StatusCode, blocking::Client};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use tracing::{debug, instrument};

use crate::error::AnkiError;

pub const API_VERSION: u8 = 6;

/// Request envelope, `{action, version, params}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Request {
	pub action:  &'static str,
	pub version: u8,
	#[serde(skip_serializing_if = "Value::is_null")]
	pub params:  Value,
}

impl Request {
	pub fn new(action: &'static str, params: Value) -> Self { Self { action, version: API_VERSION, params } }
}

#[derive(Debug, Deserialize)]
struct Response {
	#[serde(default)]
	result: Value,
	#[serde(default)]
	error:  Value,
}

/// Carries one request to AnkiConnect and returns the raw response body.
pub trait Transport {
	fn send(&self, request: &Request) -> Result<Value, AnkiError>;
}

impl<T: Transport + ?Sized> Transport for &T {
	fn send(&self, request: &Request) -> Result<Value, AnkiError> { (**self).send(request) }
}

/// Blocking HTTP transport to a running AnkiConnect.
#[derive(Debug, Clone)]
pub struct HttpTransport {
	url:    String,
	client: Client,
}

impl HttpTransport {
	pub fn new(url: impl Into<String>) -> Self { Self { url: url.into(), client: Client::new() } }
}

impl Transport for HttpTransport {
	fn send(&self, request: &Request) -> Result<Value, AnkiError> {
		let response = self.client.post(&self.url).json(request).send()?;
		if response.status() != StatusCode::OK {
			return Err(AnkiError::Status(response.status().as_u16()));
		}
		Ok(response.json()?)
	}
}

/// A card template, `{{front}}` on the question side and `{{back}}` on the answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardTemplate {
	#[serde(rename = "Name")]
	pub name:  String,
	#[serde(rename = "Front")]
	pub front: String,
	#[serde(rename = "Back")]
	pub back:  String,
}

#[derive(Debug, Deserialize)]
struct NoteInfo {
	#[serde(default)]
	fields: HashMap<String, FieldValue>,
}

#[derive(Debug, Deserialize)]
struct FieldValue {
	value: String,
}

#[derive(Debug, Clone)]
pub struct AnkiClient<T> {
	transport: T,
}

impl<T: Transport> AnkiClient<T> {
	pub fn new(transport: T) -> Self { Self { transport } }

	pub fn transport(&self) -> &T { &self.transport }

	/// Sends `action` and decodes its `result`. A non-null `error` fails the call.
	pub fn call<R: DeserializeOwned>(&self, action: &'static str, params: Value) -> Result<R, AnkiError> {
		debug!("AnkiConnect {}", action);
		let body = self.transport.send(&Request::new(action, params))?;
		let response: Response = serde_json::from_value(body)?;
		match response.error {
			Value::Null => Ok(serde_json::from_value(response.result)?),
			Value::String(message) => Err(AnkiError::Api(message)),
			other => Err(AnkiError::Api(other.to_string())),
		}
	}

	pub fn deck_names(&self) -> Result<Vec<String>, AnkiError> { self.call("deckNames", Value::Null) }

	pub fn create_deck(&self, deck: &str) -> Result<i64, AnkiError> { self.call("createDeck", json!({ "deck": deck })) }

	pub fn model_names(&self) -> Result<Vec<String>, AnkiError> { self.call("modelNames", Value::Null) }

	#[instrument(skip(self, templates))]
	pub fn create_model(&self, name: &str, fields: &[&str], templates: &[CardTemplate]) -> Result<(), AnkiError> {
		let _: Value = self.call(
			"createModel",
			json!({
				"modelName": name,
				"inOrderFields": fields,
				"isCloze": false,
				"cardTemplates": templates,
			}),
		)?;
		Ok(())
	}

	pub fn find_cards(&self, query: &str) -> Result<Vec<i64>, AnkiError> {
		self.call("findCards", json!({ "query": query }))
	}

	/// Zero or one card; more than one match is an error.
	pub fn find_card(&self, query: &str) -> Result<Option<i64>, AnkiError> {
		let cards = self.find_cards(query)?;
		match cards.as_slice() {
			[] => Ok(None),
			[card] => Ok(Some(*card)),
			_ => Err(AnkiError::Count { action: "findCards", expected: "0 or 1", found: cards.len() }),
		}
	}

	pub fn find_notes(&self, query: &str) -> Result<Vec<i64>, AnkiError> {
		self.call("findNotes", json!({ "query": query }))
	}

	pub fn cards_to_notes(&self, cards: &[i64]) -> Result<Vec<i64>, AnkiError> {
		self.call("cardsToNotes", json!({ "cards": cards }))
	}

	pub fn card_to_note(&self, card: i64) -> Result<i64, AnkiError> {
		let notes = self.cards_to_notes(&[card])?;
		match notes.as_slice() {
			[note] => Ok(*note),
			_ => Err(AnkiError::Count { action: "cardsToNotes", expected: "1", found: notes.len() }),
		}
	}

	/// Value of one field of a note, read through `notesInfo`.
	pub fn note_field(&self, note: i64, field: &str) -> Result<String, AnkiError> {
		let mut infos: Vec<NoteInfo> = self.call("notesInfo", json!({ "notes": [note] }))?;
		if infos.len() != 1 {
			return Err(AnkiError::Count { action: "notesInfo", expected: "1", found: infos.len() });
		}
		infos
			.remove(0)
			.fields
			.remove(field)
			.map(|field| field.value)
			.ok_or_else(|| AnkiError::MissingField { note, field: field.to_string() })
	}

	pub fn update_note_fields(&self, note: i64, fields: &BTreeMap<&str, String>) -> Result<(), AnkiError> {
		if note <= 0 {
			return Err(AnkiError::InvalidInput("invalid note id"));
		}
		if fields.is_empty() {
			return Err(AnkiError::InvalidInput("no fields to update"));
		}
		let _: Value = self.call("updateNoteFields", json!({ "note": { "id": note, "fields": fields } }))?;
		Ok(())
	}

	/// Adds a note and returns its id.
	pub fn add_note(&self, deck: &str, model: &str, fields: &BTreeMap<&str, String>) -> Result<i64, AnkiError> {
		if deck.is_empty() {
			return Err(AnkiError::InvalidInput("deck name cannot be empty"));
		}
		if model.is_empty() {
			return Err(AnkiError::InvalidInput("model name cannot be empty"));
		}
		if fields.is_empty() {
			return Err(AnkiError::InvalidInput("no fields provided for the note"));
		}
		self.call("addNote", json!({ "note": { "deckName": deck, "modelName": model, "fields": fields } }))
	}

	pub fn delete_notes(&self, notes: &[i64]) -> Result<(), AnkiError> {
		let _: Value = self.call("deleteNotes", json!({ "notes": notes }))?;
		Ok(())
	}

	/// Stores base64 `data` in the media folder and returns the stored name.
	pub fn store_media_file(&self, name: &str, data: &str) -> Result<String, AnkiError> {
		self.call("storeMediaFile", json!({ "filename": name, "data": data }))
	}
}

#[cfg(test)]
mod tests {
	use std::cell::RefCell;

	use super::*;

	/// Answers every request with a fixed body and remembers what was sent.
	struct Canned {
		body: Value,
		sent: RefCell<Vec<Request>>,
	}

	impl Canned {
		fn new(body: Value) -> Self { Self { body, sent: RefCell::new(Vec::new()) } }
	}

	impl Transport for Canned {
		fn send(&self, request: &Request) -> Result<Value, AnkiError> {
			self.sent.borrow_mut().push(request.clone());
			Ok(self.body.clone())
		}
	}

	#[test]
	fn envelope_carries_version_six() {
		let request = Request::new("deckNames", Value::Null);
		assert_eq!(serde_json::to_value(&request).unwrap(), json!({ "action": "deckNames", "version": 6 }));

		let request = Request::new("findCards", json!({ "query": "q" }));
		assert_eq!(serde_json::to_value(&request).unwrap()["params"]["query"], "q");
	}

	#[test]
	fn api_error_field_fails_the_call() {
		let client = AnkiClient::new(Canned::new(json!({ "result": null, "error": "deck was not found" })));
		assert!(matches!(client.deck_names(), Err(AnkiError::Api(msg)) if msg == "deck was not found"));
	}

	#[test]
	fn find_card_allows_zero_or_one() {
		let none = AnkiClient::new(Canned::new(json!({ "result": [], "error": null })));
		assert_eq!(none.find_card("q").unwrap(), None);

		let one = AnkiClient::new(Canned::new(json!({ "result": [7], "error": null })));
		assert_eq!(one.find_card("q").unwrap(), Some(7));

		let two = AnkiClient::new(Canned::new(json!({ "result": [7, 8], "error": null })));
		assert!(matches!(two.find_card("q"), Err(AnkiError::Count { found: 2, .. })));
	}

	#[test]
	fn note_field_reads_notes_info() {
		let client = AnkiClient::new(Canned::new(json!({
			"result": [{ "noteId": 3, "fields": { "hash": { "value": "abc", "order": 3 } } }],
			"error": null,
		})));
		assert_eq!(client.note_field(3, "hash").unwrap(), "abc");
		assert!(matches!(client.note_field(3, "fixme"), Err(AnkiError::MissingField { note: 3, .. })));
		assert_eq!(client.transport().sent.borrow()[0].params, json!({ "notes": [3] }));
	}

	#[test]
	fn update_validates_before_sending() {
		let client = AnkiClient::new(Canned::new(json!({ "result": null, "error": null })));
		assert!(matches!(client.update_note_fields(0, &BTreeMap::new()), Err(AnkiError::InvalidInput(_))));
		assert!(matches!(client.add_note("", "m", &BTreeMap::new()), Err(AnkiError::InvalidInput(_))));
		assert!(client.transport().sent.borrow().is_empty());

		let fields = BTreeMap::from([("hash", "x".to_string())]);
		client.update_note_fields(5, &fields).unwrap();
		assert_eq!(client.transport().sent.borrow()[0].params, json!({ "note": { "id": 5, "fields": { "hash": "x" } } }));
	}

	#[test]
	fn create_model_sends_fields_and_templates() {
		let client = AnkiClient::new(Canned::new(json!({ "result": {}, "error": null })));
		let template =
			CardTemplate { name: "Card 1".into(), front: "{{front}}".into(), back: "{{back}}".into() };
		client.create_model("Zettel", &["front", "back"], &[template]).unwrap();

		let sent = client.transport().sent.borrow();
		assert_eq!(sent[0].params["inOrderFields"], json!(["front", "back"]));
		assert_eq!(sent[0].params["cardTemplates"][0]["Front"], "{{front}}");
		assert_eq!(sent[0].params["isCloze"], false);
	}
}
