use std::{fmt, ops::Range};

use crate::latex::parser;

/// Byte range into the document source.
pub type Span = Range<usize>;

/// The closed set of constructs the tree distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
	SourceFile,
	Command,
	CommandName,
	Environment,
	Begin,
	End,
	CurlyGroup,
	CurlyGroupText,
	BrackGroup,
	Text,
	Comment,
	Verbatim,
}

impl NodeKind {
	/// Name used by the pattern query language.
	pub fn name(self) -> &'static str {
		match self {
			NodeKind::SourceFile => "source_file",
			NodeKind::Command => "generic_command",
			NodeKind::CommandName => "command_name",
			NodeKind::Environment => "generic_environment",
			NodeKind::Begin => "begin",
			NodeKind::End => "end",
			NodeKind::CurlyGroup => "curly_group",
			NodeKind::CurlyGroupText => "curly_group_text",
			NodeKind::BrackGroup => "brack_group",
			NodeKind::Text => "text",
			NodeKind::Comment => "comment",
			NodeKind::Verbatim => "verbatim",
		}
	}

	pub fn is_group(self) -> bool {
		matches!(self, NodeKind::CurlyGroup | NodeKind::BrackGroup | NodeKind::CurlyGroupText)
	}
}

impl fmt::Display for NodeKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}

/// Role of a node inside its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
	Command,
	Name,
	Arg,
}

impl Field {
	pub fn name(self) -> &'static str {
		match self {
			Field::Command => "command",
			Field::Name => "name",
			Field::Arg => "arg",
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
	pub(crate) kind:     NodeKind,
	pub(crate) span:     Span,
	pub(crate) field:    Option<Field>,
	pub(crate) children: Vec<Node>,
}

impl Node {
	pub(crate) fn new(kind: NodeKind, span: Span) -> Self {
		Self { kind, span, field: None, children: Vec::new() }
	}

	pub(crate) fn with_field(mut self, field: Field) -> Self {
		self.field = Some(field);
		self
	}

	pub fn kind(&self) -> NodeKind { self.kind }

	pub fn span(&self) -> Span { self.span.clone() }

	pub fn start(&self) -> usize { self.span.start }

	pub fn field(&self) -> Option<Field> { self.field }

	pub fn children(&self) -> &[Node] { &self.children }

	pub fn child(&self, index: usize) -> Option<&Node> { self.children.get(index) }

	pub fn text<'s>(&self, source: &'s str) -> &'s str { &source[self.span.clone()] }

	/// Pre-order, depth-first walk starting at (and including) this node.
	pub fn walk(&self) -> Preorder<'_> { Preorder { stack: vec![self] } }

	pub fn as_command(&self) -> Option<Command<'_>> {
		(self.kind == NodeKind::Command).then_some(Command { node: self })
	}

	pub fn as_environment(&self) -> Option<Environment<'_>> {
		(self.kind == NodeKind::Environment).then_some(Environment { node: self })
	}
}

pub struct Preorder<'n> {
	stack: Vec<&'n Node>,
}

impl<'n> Iterator for Preorder<'n> {
	type Item = &'n Node;

	fn next(&mut self) -> Option<Self::Item> {
		let node = self.stack.pop()?;
		self.stack.extend(node.children.iter().rev());
		Some(node)
	}
}

/// Typed view of a `generic_command` node.
#[derive(Debug, Clone, Copy)]
pub struct Command<'n> {
	node: &'n Node,
}

impl<'n> Command<'n> {
	pub fn node(&self) -> &'n Node { self.node }

	/// `None` only for a node not built by the parser, which always puts the
	/// command token first.
	pub fn name_node(&self) -> Option<&'n Node> { self.node.children.first() }

	/// Command token including the backslash, e.g. `\zref`.
	pub fn name<'s>(&self, source: &'s str) -> &'s str {
		self.name_node().map(|n| n.text(source)).unwrap_or_default()
	}

	/// Argument groups, in source order.
	pub fn arguments(&self) -> &'n [Node] { self.node.children.get(1..).unwrap_or_default() }
}

/// Typed view of a `generic_environment` node.
#[derive(Debug, Clone, Copy)]
pub struct Environment<'n> {
	node: &'n Node,
}

impl<'n> Environment<'n> {
	pub fn node(&self) -> &'n Node { self.node }

	pub fn begin(&self) -> &'n Node { &self.node.children[0] }

	pub fn end(&self) -> Option<&'n Node> {
		self.node.children.last().filter(|n| n.kind == NodeKind::End)
	}

	pub fn name_node(&self) -> Option<&'n Node> {
		self.begin().children.iter().find(|n| n.field == Some(Field::Name))
	}

	/// Environment name without braces, e.g. `flashcard`.
	pub fn name<'s>(&self, source: &'s str) -> &'s str {
		self.name_node().map(|n| strip_delimiters(n.text(source)).trim()).unwrap_or_default()
	}

	/// Every group following the name inside `\begin`, in source order.
	pub fn arguments(&self) -> &'n [Node] {
		let begin = self.begin();
		let after_name =
			begin.children.iter().position(|n| n.field == Some(Field::Name)).map_or(begin.children.len(), |i| i + 1);
		&begin.children[after_name..]
	}

	/// Nodes between `\begin{..}` and `\end{..}`.
	pub fn content(&self) -> &'n [Node] {
		let children = &self.node.children;
		let stop = if self.end().is_some() { children.len() - 1 } else { children.len() };
		&children[1..stop]
	}

	/// Byte range of the body: from the end of `\begin{..}` and its arguments up
	/// to `\end`, or to the end of the node when the environment is unterminated.
	pub fn body_span(&self) -> Span {
		let start = self.begin().span.end;
		let end = self.end().map_or(self.node.span.end, |e| e.span.start);
		start..end.max(start)
	}
}

/// Strips exactly one pair of `{}` or `[]` delimiters, if present.
pub fn strip_delimiters(text: &str) -> &str {
	let bytes = text.as_bytes();
	if bytes.len() >= 2 {
		let pair = (bytes[0], bytes[bytes.len() - 1]);
		if pair == (b'{', b'}') || pair == (b'[', b']') {
			return &text[1..text.len() - 1];
		}
	}
	text
}

/// A source buffer together with its syntax tree. Nodes only hold byte offsets
/// into `source`.
#[derive(Debug, Clone)]
pub struct Document {
	source: String,
	root:   Node,
}

impl Document {
	pub fn parse(source: impl Into<String>) -> Self {
		let source = source.into();
		let root = parser::parse(&source);
		Self { source, root }
	}

	pub fn source(&self) -> &str { &self.source }

	pub fn root(&self) -> &Node { &self.root }

	pub fn text(&self, node: &Node) -> &str { node.text(&self.source) }

	/// Everything before the first `document` environment.
	pub fn preamble(&self) -> Option<&str> {
		self.root
			.walk()
			.filter_map(Node::as_environment)
			.find(|env| env.name(&self.source) == "document")
			.map(|env| &self.source[..env.node().span.start])
	}

	/// Indented one-node-per-line rendering, used by the `tree` subcommand.
	pub fn dump(&self) -> String {
		let mut out = String::new();
		self.dump_node(&self.root, 0, &mut out);
		out
	}

	fn dump_node(&self, node: &Node, depth: usize, out: &mut String) {
		out.push_str(&"..".repeat(depth));
		if let Some(field) = node.field {
			out.push_str(field.name());
			out.push_str(": ");
		}
		out.push_str(node.kind.name());
		out.push_str(": ");
		out.push_str(&format!("{:?}", self.text(node)));
		out.push('\n');
		for child in &node.children {
			self.dump_node(child, depth + 1, out);
		}
	}
}
