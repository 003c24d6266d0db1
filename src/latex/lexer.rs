use std::ops::Range;

use logos::Logos;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
	#[token("\\begin")]
	Begin,

	#[token("\\end")]
	End,

	#[regex(r"\\[a-zA-Z@]+\*?")]
	Command,

	// Control symbols such as \{ \% \\ are plain text for our purposes
	#[regex(r"\\[^a-zA-Z@]")]
	Symbol,

	#[token("{")]
	LBrace,

	#[token("}")]
	RBrace,

	#[token("[")]
	LBracket,

	#[token("]")]
	RBracket,

	#[token("%")]
	Percent,

	#[regex(r"[ \t]+")]
	Space,

	#[regex(r"\r?\n")]
	Newline,

	#[regex(r"[^\\{}\[\]% \t\r\n]+")]
	Word,
}

/// Tokenizes the whole source up front for the chumsky stream. The
/// only input the lexer rejects is a lone trailing backslash, kept as a word.
pub fn tokenize(source: &str) -> Vec<(Token, Range<usize>)> {
	Token::lexer(source)
		.spanned()
		.map(|(token, span)| match token {
			Ok(token) => (token, span),
			Err(_) => (Token::Word, span),
		})
		.collect()
}
