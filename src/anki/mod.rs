//! Flashcard synchronization with Anki through AnkiConnect.

pub mod client;
pub mod local;
pub mod render;
pub mod sync;

pub use client::{AnkiClient, HttpTransport, Request, Transport};
pub use local::{Flashcard, LocalScan, scan_flashcards};
pub use render::{LatexPipeline, Renderer, Toolchain};
pub use sync::{SyncOutcome, SyncReport, Synchronizer};
