//! LaTeX syntax layer: lexer, tree builder, and the queries run over the tree.

pub mod lexer;
pub mod parser;
pub mod pattern;
pub mod query;
pub mod tree;

pub use pattern::Query;
pub use query::{CommandMatch, EnvironmentMatch, find_commands, find_environments};
pub use tree::{Document, Node, NodeKind, strip_delimiters};
