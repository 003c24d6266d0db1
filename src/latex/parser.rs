//! Builds the syntax tree from the logos token stream with chumsky. Parsing
//! never fails: anything the grammar cannot make sense of ends up as `text`,
//! unterminated groups and environments run to the point where their parent
//! closes (or end of input).

use chumsky::{input::{Emitter, Stream, ValueInput}, prelude::*};
use tracing::trace;

use crate::latex::{lexer::{Token, tokenize}, tree::{Field, Node, NodeKind, Span}};

/// Environments whose body is kept as one raw node.
const VERBATIM_ENVIRONMENTS: &[&str] = &["verbatim", "verbatim*", "lstlisting", "minted", "comment"];

/// Tokens that are plain text wherever they appear.
const TEXT: &[Token] = &[Token::Word, Token::Space, Token::Newline, Token::Symbol, Token::LBracket];

type Extra<'t> = extra::Err<Rich<'t, Token>>;

/// One item of a content list before `\begin` and `\end` are paired up.
enum Piece {
	Node(Node),
	Begin { name: String, begin: Node },
	End { name: String, end: Node, command: Node },
}

pub fn parse(source: &str) -> Node {
	let tokens = tokenize(source).into_iter().map(|(token, span)| (token, SimpleSpan::from(span)));
	let eoi = SimpleSpan::from(source.len()..source.len());
	let stream = Stream::from_iter(tokens).map(eoi, |(t, s)| (t, s));

	let (children, errors) = document(source).parse(stream).into_output_errors();
	for err in &errors {
		trace!("recovered at {:?}: {:?}", err.span(), err.reason());
	}

	let mut root = Node::new(NodeKind::SourceFile, 0..source.len());
	root.children = children.unwrap_or_default();
	root
}

fn document<'t, I>(source: &'t str) -> impl Parser<'t, I, Vec<Node>, Extra<'t>>
where
	I: ValueInput<'t, Token = Token, Span = SimpleSpan>,
{
	// Bracket groups only appear as arguments, so a stray `]` inside braces is
	// text and vice versa.
	let group = recursive(|group| {
		let curly = just(Token::LBrace)
			.ignore_then(content(source, group.clone(), &[Token::RBracket]))
			.then(just(Token::RBrace).or_not())
			.validate(|(children, close), e, emitter| {
				close_group(NodeKind::CurlyGroup, children, close.is_some(), e.span(), emitter)
			});
		let brack = just(Token::LBracket)
			.ignore_then(content(source, group, &[Token::RBrace]))
			.then(just(Token::RBracket).or_not())
			.validate(|(children, close), e, emitter| {
				close_group(NodeKind::BrackGroup, children, close.is_some(), e.span(), emitter)
			});
		curly.or(brack)
	});

	content(source, group, &[Token::RBrace, Token::RBracket])
}

/// Nodes up to the closer of the enclosing group. `stray` lists the closers
/// that are text in this position.
fn content<'t, I, G>(
	source: &'t str,
	group: G,
	stray: &'static [Token],
) -> impl Parser<'t, I, Vec<Node>, Extra<'t>> + Clone
where
	I: ValueInput<'t, Token = Token, Span = SimpleSpan>,
	G: Parser<'t, I, Node, Extra<'t>> + Clone,
{
	let spaces = just(Token::Space).repeated();

	// Curly groups may be separated from their command by inline spaces,
	// bracket groups must be adjacent.
	let arguments = spaces
		.clone()
		.ignore_then(just(Token::LBrace).rewind())
		.ignore_then(group.clone())
		.or(just(Token::LBracket).rewind().ignore_then(group.clone()))
		.map(|arg| arg.with_field(Field::Arg))
		.repeated()
		.collect::<Vec<_>>();

	// Only words and spaces may appear inside an environment name.
	let name_group = just(Token::LBrace)
		.then(one_of([Token::Word, Token::Space]).repeated())
		.then(just(Token::RBrace))
		.map_with(|_, e: &mut chumsky::input::MapExtra<'t, '_, I, Extra<'t>>| e.span().into_range());
	let tag = |keyword: Token| {
		just(keyword)
			.map_with(|_, e: &mut chumsky::input::MapExtra<'t, '_, I, Extra<'t>>| e.span().into_range())
			.then(spaces.clone().ignore_then(name_group.clone()))
	};

	let verbatim = choice(
		VERBATIM_ENVIRONMENTS
			.iter()
			.map(|&name| {
				let closing = tag(Token::End).filter(move |(_, group)| group_name(source, group) == name);
				tag(Token::Begin)
					.filter(move |(_, group)| group_name(source, group) == name)
					.then(arguments.clone())
					.then(
						any()
							.and_is(closing.clone().not())
							.repeated()
							.at_least(1)
							.map_with(|_, e: &mut chumsky::input::MapExtra<'t, '_, I, Extra<'t>>| e.span().into_range())
							.or_not(),
					)
					.then(closing.or_not())
					.map(|((((keyword, group), args), body), end)| {
						verbatim_environment(begin_node(keyword, group, args), body, end)
					})
			})
			.collect::<Vec<_>>(),
	)
	.map(Piece::Node);

	let begin = tag(Token::Begin).then(arguments.clone()).map(move |((keyword, group), args)| Piece::Begin {
		name:  group_name(source, &group).to_string(),
		begin: begin_node(keyword, group, args),
	});

	let end = tag(Token::End).map(move |(keyword, group)| Piece::End {
		name:    group_name(source, &group).to_string(),
		end:     end_node(keyword.clone(), group.clone()),
		command: stray_end(keyword, group),
	});

	// A `\begin` or `\end` without a plain name group is an ordinary command
	let command = one_of([Token::Command, Token::Begin, Token::End])
		.map_with(|_, e: &mut chumsky::input::MapExtra<'t, '_, I, Extra<'t>>| e.span().into_range())
		.then(arguments)
		.map(|(name, args)| Piece::Node(command_node(name, args)));

	let comment = just(Token::Percent)
		.then(none_of(Token::Newline).repeated())
		.map_with(|_, e: &mut chumsky::input::MapExtra<'t, '_, I, Extra<'t>>| Piece::Node(Node::new(NodeKind::Comment, e.span().into_range())));

	let curly = just(Token::LBrace).rewind().ignore_then(group).map(Piece::Node);

	let text = any()
		.filter(move |token: &Token| TEXT.contains(token) || stray.contains(token))
		.repeated()
		.at_least(1)
		.map_with(|_, e: &mut chumsky::input::MapExtra<'t, '_, I, Extra<'t>>| Piece::Node(Node::new(NodeKind::Text, e.span().into_range())));

	choice((verbatim, begin, end, command, comment, curly, text))
		.repeated()
		.collect::<Vec<_>>()
		.map(pair_environments)
}

fn close_group(
	kind: NodeKind,
	children: Vec<Node>,
	closed: bool,
	span: SimpleSpan,
	emitter: &mut Emitter<Rich<'_, Token>>,
) -> Node {
	if !closed {
		emitter.emit(Rich::custom(span, format!("unterminated {kind}")));
	}
	let mut node = Node::new(kind, span.into_range());
	node.children = children;
	node
}

/// Environment name inside a `{name}` group.
fn group_name<'s>(source: &'s str, group: &Span) -> &'s str { source[group.start + 1..group.end - 1].trim() }

fn group_text(group: &Span) -> Option<Node> {
	let inner = group.start + 1..group.end - 1;
	(!inner.is_empty()).then(|| Node::new(NodeKind::Text, inner))
}

fn command_node(name: Span, args: Vec<Node>) -> Node {
	let mut node = Node::new(NodeKind::Command, name.clone());
	node.children.push(Node::new(NodeKind::CommandName, name).with_field(Field::Command));
	node.children.extend(args);
	node.span.end = node.children.last().map_or(node.span.end, |c| c.span.end);
	node
}

fn begin_node(keyword: Span, group: Span, args: Vec<Node>) -> Node {
	let mut name = Node::new(NodeKind::CurlyGroupText, group.clone()).with_field(Field::Name);
	name.children.extend(group_text(&group));

	let mut node = Node::new(NodeKind::Begin, keyword.start..group.end);
	node.children.push(Node::new(NodeKind::CommandName, keyword).with_field(Field::Command));
	node.children.push(name);
	node.children.extend(args);
	node.span.end = node.children.last().map_or(node.span.end, |c| c.span.end);
	node
}

fn end_node(keyword: Span, group: Span) -> Node {
	let mut name = Node::new(NodeKind::CurlyGroupText, group.clone()).with_field(Field::Name);
	name.children.extend(group_text(&group));

	let mut node = Node::new(NodeKind::End, keyword.start..group.end);
	node.children.push(Node::new(NodeKind::CommandName, keyword).with_field(Field::Command));
	node.children.push(name);
	node
}

/// `\end{name}` closing nothing that is open: a command with one argument.
fn stray_end(keyword: Span, group: Span) -> Node {
	let mut arg = Node::new(NodeKind::CurlyGroup, group.clone()).with_field(Field::Arg);
	arg.children.extend(group_text(&group));
	command_node(keyword, vec![arg])
}

fn verbatim_environment(begin: Node, body: Option<Span>, end: Option<(Span, Span)>) -> Node {
	let mut env = Node::new(NodeKind::Environment, begin.span());
	env.children.push(begin);
	env.children.extend(body.map(|body| Node::new(NodeKind::Verbatim, body)));
	match end {
		Some((keyword, group)) => env.children.push(end_node(keyword, group)),
		None => trace!("unterminated verbatim environment at byte {}", env.span.start),
	}
	env.span.end = env.children.last().map_or(env.span.end, |c| c.span.end);
	env
}

/// Appends `node` to the innermost open environment, or to `out`.
fn push(open: &mut [(String, Node)], out: &mut Vec<Node>, node: Node) {
	match open.last_mut() {
		Some((_, env)) => {
			env.span.end = node.span.end;
			env.children.push(node);
		}
		None => out.push(node),
	}
}

fn close_unterminated(open: &mut Vec<(String, Node)>, out: &mut Vec<Node>) {
	if let Some((name, env)) = open.pop() {
		trace!("unterminated environment '{}' at byte {}", name, env.span.start);
		push(open, out, env);
	}
}

/// Pairs every `\end{name}` with the innermost open environment of that name.
/// Environments opened after it stay unterminated; an `\end` matching nothing
/// is kept as a command. Pairing never crosses a group boundary.
fn pair_environments(pieces: Vec<Piece>) -> Vec<Node> {
	let mut out = Vec::new();
	let mut open: Vec<(String, Node)> = Vec::new();

	for piece in pieces {
		match piece {
			Piece::Node(node) => push(&mut open, &mut out, node),
			Piece::Begin { name, begin } => {
				let mut env = Node::new(NodeKind::Environment, begin.span());
				env.children.push(begin);
				open.push((name, env));
			}
			Piece::End { name, end, command } => match open.iter().rposition(|(pending, _)| *pending == name) {
				Some(depth) => {
					for _ in depth + 1..open.len() {
						close_unterminated(&mut open, &mut out);
					}
					if let Some((_, mut env)) = open.pop() {
						env.span.end = end.span.end;
						env.children.push(end);
						push(&mut open, &mut out, env);
					}
				}
				None => push(&mut open, &mut out, command),
			},
		}
	}

	while !open.is_empty() {
		close_unterminated(&mut open, &mut out);
	}
	out
}
