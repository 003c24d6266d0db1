//! A small tree-sitter style query language over the syntax tree.
//!
//! ```text
//! ((generic_command command: (command_name) @cmd arg: (curly_group) @ref)
//!  (#any-of? @cmd "\\zref" "\\zinc"))
//! ```
//!
//! `(kind child...)` matches a node of that kind whose children contain the
//! child patterns in order, `_` matches any kind, `field: (..)` constrains the
//! child's field and `@name` captures the node. Predicates (`#eq?`,
//! `#not-eq?`, `#match?`, `#not-match?`, `#any-of?`, `#not-any-of?`) filter the
//! matches by captured text. `;` starts a comment.

use ariadne::{Config, Label, Report, ReportKind, Source};
use chumsky::{prelude::*, span::Span as _};
use regex::Regex;
use tracing::{debug, instrument};

use crate::{error::QueryError, latex::tree::Node};

/// Parsed, not yet validated, node pattern.
#[derive(Debug, Clone, PartialEq)]
struct RawNode {
	field:      Option<String>,
	kind:       String,
	children:   Vec<RawNode>,
	captures:   Vec<String>,
	predicates: Vec<RawPredicate>,
}

#[derive(Debug, Clone, PartialEq)]
struct RawPredicate {
	name: String,
	args: Vec<Operand>,
}

#[derive(Debug, Clone, PartialEq)]
enum Item {
	Child(RawNode),
	Predicate(RawPredicate),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
	Capture(String),
	Literal(String),
}

fn query_parser<'a>() -> impl Parser<'a, &'a str, Vec<RawNode>, extra::Err<Rich<'a, char>>> {
	let comment = just(';').then(none_of('\n').repeated()).ignored();
	let ws = choice((one_of(" \t\r\n").ignored(), comment)).repeated().ignored();

	let ident = any()
		.filter(|c: &char| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '?' | '!'))
		.repeated()
		.at_least(1)
		.to_slice()
		.map(|s: &str| s.to_string());

	let capture = just('@').ignore_then(ident.clone());

	let escape = just('\\').ignore_then(choice((
		just('\\'),
		just('"'),
		just('n').to('\n'),
		just('t').to('\t'),
	)));
	let string = none_of("\\\"").or(escape).repeated().collect::<String>().delimited_by(just('"'), just('"'));

	let operand = choice((capture.clone().map(Operand::Capture), string.map(Operand::Literal)));

	let predicate = just('#')
		.ignore_then(ident.clone())
		.then(ws.clone().ignore_then(operand).repeated().collect::<Vec<_>>())
		.then_ignore(ws.clone())
		.delimited_by(just('(').then(ws.clone()), just(')'))
		.map(|(name, args)| RawPredicate { name, args });

	let captures = ws.clone().ignore_then(capture).repeated().collect::<Vec<_>>();

	let node = recursive(|node| {
		let field = ident.clone().then_ignore(ws.clone()).then_ignore(just(':')).then_ignore(ws.clone());
		let child = field.or_not().then(node).map(|(field, mut child): (Option<String>, RawNode)| {
			child.field = field;
			Item::Child(child)
		});
		let item = choice((predicate.clone().map(Item::Predicate), child));

		let parenthesized = ident
			.clone()
			.then(ws.clone().ignore_then(item).repeated().collect::<Vec<_>>())
			.then_ignore(ws.clone())
			.delimited_by(just('(').then(ws.clone()), just(')'))
			.then(captures.clone())
			.map(|((kind, items), captures)| {
				let mut node =
					RawNode { field: None, kind, children: Vec::new(), captures, predicates: Vec::new() };
				for item in items {
					match item {
						Item::Child(child) => node.children.push(child),
						Item::Predicate(predicate) => node.predicates.push(predicate),
					}
				}
				node
			});

		let wildcard = just('_').ignore_then(captures.clone()).map(|captures| RawNode {
			field: None,
			kind: "_".to_string(),
			children: Vec::new(),
			captures,
			predicates: Vec::new(),
		});

		choice((parenthesized, wildcard))
	});

	// `((pattern) (#predicate ..) ..)` groups a pattern with its predicates
	let group = node
		.clone()
		.then(ws.clone().ignore_then(predicate).repeated().collect::<Vec<_>>())
		.then_ignore(ws.clone())
		.delimited_by(just('(').then(ws.clone()), just(')'))
		.map(|(mut node, predicates): (RawNode, Vec<RawPredicate>)| {
			node.predicates.extend(predicates);
			node
		});

	ws.clone()
		.ignore_then(choice((group, node)).then_ignore(ws).repeated().at_least(1).collect::<Vec<_>>())
		.then_ignore(end())
}

fn render_errors(source: &str, errors: &[Rich<'_, char>]) -> String {
	let mut out = Vec::new();
	for error in errors {
		let span = error.span().start()..error.span().end();
		let report = Report::build(ReportKind::Error, span.clone())
			.with_config(Config::default().with_color(false))
			.with_message(error.to_string())
			.with_label(Label::new(span).with_message(error.reason().to_string()))
			.finish();
		if report.write(Source::from(source), &mut out).is_err() {
			out.extend_from_slice(error.to_string().as_bytes());
		}
	}
	String::from_utf8_lossy(&out).into_owned()
}

#[derive(Debug, Clone)]
enum Predicate {
	Eq { capture: String, value: Operand, negate: bool },
	Match { capture: String, regex: Regex, negate: bool },
	AnyOf { capture: String, values: Vec<String>, negate: bool },
}

#[derive(Debug, Clone)]
struct NodePattern {
	field:    Option<String>,
	kind:     Option<String>,
	children: Vec<NodePattern>,
	captures: Vec<String>,
}

#[derive(Debug, Clone)]
struct Pattern {
	root:       NodePattern,
	predicates: Vec<Predicate>,
}

/// One capture of a match.
#[derive(Debug, Clone, Copy)]
pub struct Capture<'q, 'n> {
	pub name: &'q str,
	pub node: &'n Node,
}

#[derive(Debug, Clone)]
pub struct QueryMatch<'q, 'n> {
	pub pattern:  usize,
	pub captures: Vec<Capture<'q, 'n>>,
}

impl<'q, 'n> QueryMatch<'q, 'n> {
	pub fn nodes<'m>(&'m self, name: &'m str) -> impl Iterator<Item = &'n Node> + 'm {
		self.captures.iter().filter(move |c| c.name == name).map(|c| c.node)
	}
}

/// A compiled query.
#[derive(Debug, Clone)]
pub struct Query {
	patterns: Vec<Pattern>,
}

impl Query {
	#[instrument]
	pub fn new(source: &str) -> Result<Self, QueryError> {
		let raw = query_parser()
			.parse(source)
			.into_result()
			.map_err(|errors| QueryError::Syntax(render_errors(source, &errors)))?;

		let patterns = raw.into_iter().map(compile_pattern).collect::<Result<Vec<_>, _>>()?;
		debug!("Compiled query with {} pattern(s)", patterns.len());
		Ok(Self { patterns })
	}

	pub fn pattern_count(&self) -> usize { self.patterns.len() }

	pub fn has_capture(&self, name: &str) -> bool {
		self.patterns.iter().any(|p| {
			let mut names = Vec::new();
			collect_captures(&p.root, &mut names);
			names.contains(&name)
		})
	}

	/// All matches in pre-order of the node each pattern is anchored at.
	pub fn matches<'q, 'n>(&'q self, root: &'n Node, source: &str) -> Vec<QueryMatch<'q, 'n>> {
		let mut found = Vec::new();
		for node in root.walk() {
			for (index, pattern) in self.patterns.iter().enumerate() {
				for captures in match_node(&pattern.root, node, Vec::new()) {
					if pattern.predicates.iter().all(|p| evaluate(p, &captures, source)) {
						found.push(QueryMatch { pattern: index, captures });
					}
				}
			}
		}
		found
	}
}

fn collect_captures<'p>(pattern: &'p NodePattern, names: &mut Vec<&'p str>) {
	names.extend(pattern.captures.iter().map(String::as_str));
	for child in &pattern.children {
		collect_captures(child, names);
	}
}

fn collect_raw_predicates(node: &mut RawNode, out: &mut Vec<RawPredicate>) {
	out.append(&mut node.predicates);
	for child in &mut node.children {
		collect_raw_predicates(child, out);
	}
}

fn lower_node(raw: RawNode) -> NodePattern {
	NodePattern {
		field:    raw.field,
		kind:     (raw.kind != "_").then_some(raw.kind),
		children: raw.children.into_iter().map(lower_node).collect(),
		captures: raw.captures,
	}
}

fn compile_pattern(mut raw: RawNode) -> Result<Pattern, QueryError> {
	let mut raw_predicates = Vec::new();
	collect_raw_predicates(&mut raw, &mut raw_predicates);
	let root = lower_node(raw);

	let mut names = Vec::new();
	collect_captures(&root, &mut names);

	let predicates = raw_predicates
		.into_iter()
		.map(|p| compile_predicate(p, &names))
		.collect::<Result<Vec<_>, _>>()?;

	Ok(Pattern { root, predicates })
}

fn compile_predicate(raw: RawPredicate, names: &[&str]) -> Result<Predicate, QueryError> {
	for arg in &raw.args {
		if let Operand::Capture(name) = arg {
			if !names.contains(&name.as_str()) {
				return Err(QueryError::UnknownCapture(name.clone()));
			}
		}
	}

	let negate = raw.name.starts_with("not-");
	let base = raw.name.trim_start_matches("not-").to_string();
	let mut args = raw.args.into_iter();
	let capture = match args.next() {
		Some(Operand::Capture(capture)) => capture,
		_ => {
			return Err(QueryError::Arity {
				name:     raw.name.clone(),
				expected: "a capture as first argument",
			});
		}
	};
	let rest: Vec<Operand> = args.collect();

	match base.as_str() {
		"eq?" => match <[Operand; 1]>::try_from(rest) {
			Ok([value]) => Ok(Predicate::Eq { capture, value, negate }),
			Err(_) => Err(QueryError::Arity { name: raw.name, expected: "exactly two arguments" }),
		},
		"match?" => match rest.as_slice() {
			[Operand::Literal(regex)] => Ok(Predicate::Match { capture, regex: Regex::new(regex)?, negate }),
			_ => Err(QueryError::Arity { name: raw.name, expected: "a capture and a regex string" }),
		},
		"any-of?" => {
			let values = rest
				.into_iter()
				.map(|op| match op {
					Operand::Literal(value) => Some(value),
					Operand::Capture(_) => None,
				})
				.collect::<Option<Vec<_>>>();
			match values {
				Some(values) if !values.is_empty() => Ok(Predicate::AnyOf { capture, values, negate }),
				_ => Err(QueryError::Arity { name: raw.name, expected: "a capture and string values" }),
			}
		}
		_ => Err(QueryError::UnknownPredicate(raw.name)),
	}
}

type Captures<'q, 'n> = Vec<Capture<'q, 'n>>;

fn match_node<'q, 'n>(
	pattern: &'q NodePattern,
	node: &'n Node,
	mut captures: Captures<'q, 'n>,
) -> Vec<Captures<'q, 'n>> {
	if let Some(field) = &pattern.field {
		if node.field().map(|f| f.name()) != Some(field.as_str()) {
			return Vec::new();
		}
	}
	if let Some(kind) = &pattern.kind {
		if node.kind().name() != kind {
			return Vec::new();
		}
	}

	captures.extend(pattern.captures.iter().map(|name| Capture { name: name.as_str(), node }));
	match_children(&pattern.children, node.children(), captures)
}

/// Enumerates every in-order assignment of child patterns to children.
fn match_children<'q, 'n>(
	patterns: &'q [NodePattern],
	children: &'n [Node],
	captures: Captures<'q, 'n>,
) -> Vec<Captures<'q, 'n>> {
	let Some((first, rest)) = patterns.split_first() else {
		return vec![captures];
	};

	let mut found = Vec::new();
	for (index, child) in children.iter().enumerate() {
		for partial in match_node(first, child, captures.clone()) {
			found.extend(match_children(rest, &children[index + 1..], partial));
		}
	}
	found
}

fn texts<'s>(captures: &Captures<'_, '_>, name: &str, source: &'s str) -> Vec<&'s str> {
	captures.iter().filter(|c| c.name == name).map(|c| c.node.text(source)).collect()
}

fn evaluate(predicate: &Predicate, captures: &Captures<'_, '_>, source: &str) -> bool {
	match predicate {
		Predicate::Eq { capture, value, negate } => {
			let expected = match value {
				Operand::Literal(literal) => vec![literal.as_str()],
				Operand::Capture(other) => texts(captures, other, source),
			};
			texts(captures, capture, source).iter().all(|text| expected.contains(text) != *negate)
		}
		Predicate::Match { capture, regex, negate } => {
			texts(captures, capture, source).iter().all(|text| regex.is_match(text) != *negate)
		}
		Predicate::AnyOf { capture, values, negate } => {
			texts(captures, capture, source).iter().all(|text| values.iter().any(|v| v == text) != *negate)
		}
	}
}
