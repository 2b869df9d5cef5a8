//! A scanner for the host language.
//!
//! The transformation core does not understand the host language; it only needs a
//! token stream good enough to find parenthesized expressions, identifiers, and
//! object-creation expressions, while ignoring the contents of string literals and
//! comments. `logos` drives the token table.

use logos::Logos;
use std::ops::Range;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostToken {
	#[token("(")]
	OpenParen,

	#[token(")")]
	CloseParen,

	#[token("{")]
	OpenBrace,

	#[token("}")]
	CloseBrace,

	#[token("<")]
	OpenChevron,

	#[token(">")]
	CloseChevron,

	#[token("=")]
	Equals,

	#[token(",")]
	Comma,

	#[token(";")]
	Semicolon,

	#[token(".")]
	Dot,

	#[token("/")]
	Slash,

	#[token("new")]
	KwNew,

	#[regex("[A-Za-z_@][A-Za-z0-9_]*")]
	Identifier,

	#[regex("[0-9][0-9a-fA-FxXuUlLfFdDmM._]*")]
	Number,

	#[regex(r#""([^"\\]|\\.)*""#)]
	StringLiteral,

	#[regex(r"'([^'\\]|\\.)'")]
	CharLiteral,

	#[regex("//[^\n]*")]
	LineComment,

	#[regex(r"/\*([^*]|\*+[^*/])*\*+/")]
	BlockComment,

	#[regex("[ \t\r\n\u{c}]+")]
	Whitespace,

	#[error]
	Error,
}

impl HostToken {
	/// Whitespace and comments carry no structure.
	pub fn is_trivia(&self) -> bool {
		matches!(self, HostToken::Whitespace | HostToken::LineComment | HostToken::BlockComment)
	}
}

/// A parenthesized expression found in the host token stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParenthesizedExpression {
	/// Byte offset of the `(`.
	pub open: usize,

	/// Byte offset of the matching `)` per the token stream, when one was found.
	/// The locator re-derives this from the raw text rather than trusting it.
	pub close: Option<usize>,

	/// `true` when the first significant token inside is `<` followed by an
	/// identifier; the marker that distinguishes embedded markup from arithmetic.
	pub opens_markup: bool,
}

/// The walkable result of scanning one host file.
#[derive(Debug, Clone, Default)]
pub struct HostSyntaxTree {
	/// Every parenthesized expression, ordered by the offset of its `(`.
	pub parens: Vec<ParenthesizedExpression>,

	/// The full token stream with byte spans, trivia included.
	pub tokens: Vec<(HostToken, Range<usize>)>,
}

/// Scans `text` into a [`HostSyntaxTree`].
pub fn parse_host(text: &str) -> HostSyntaxTree {
	let tokens: Vec<(HostToken, Range<usize>)> = HostToken::lexer(text).spanned().collect();

	let mut parens: Vec<ParenthesizedExpression> = Vec::new();
	let mut stack: Vec<usize> = Vec::new();

	// Indices of parens still waiting for their first inner tokens, with how many
	// they have seen (0, or 1 after an opening `<`).
	let mut pending: Vec<(usize, u8)> = Vec::new();

	for (token, span) in tokens.iter() {
		if token.is_trivia() {
			continue;
		}

		// Resolve the qualification state of any paren still collecting tokens.
		pending.retain_mut(|(index, seen)| match (*seen, token) {
			(0, HostToken::OpenChevron) => {
				*seen = 1;
				true
			}
			(0, _) => false,
			(_, HostToken::Identifier) => {
				parens[*index].opens_markup = true;
				false
			}
			_ => false,
		});

		match token {
			HostToken::OpenParen => {
				let index = parens.len();
				parens.push(ParenthesizedExpression { open: span.start, close: None, opens_markup: false });
				stack.push(index);
				pending.push((index, 0));
			}
			HostToken::CloseParen => {
				if let Some(index) = stack.pop() {
					parens[index].close = Some(span.start);
				}
			}
			_ => {}
		}
	}

	HostSyntaxTree { parens, tokens }
}

/// Collects the distinct identifiers of a host buffer, in order of first
/// appearance. Used for completion.
pub fn identifiers(text: &str) -> Vec<String> {
	let mut seen = std::collections::HashSet::new();
	let mut names = Vec::new();

	for (token, span) in HostToken::lexer(text).spanned() {
		if token == HostToken::Identifier {
			let name = &text[span];
			if seen.insert(name.to_string()) {
				names.push(name.to_string());
			}
		}
	}

	names
}

/// An object-creation expression `new <Ident>Props …` in the derived text: the
/// "property container" that holds the attributes of one generated element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyContainer {
	/// Byte offset of the `new` keyword.
	pub start: usize,

	/// Byte offset one past the type identifier.
	pub type_end: usize,

	/// Byte offset one past the closing bracket of the initializer or argument
	/// list.
	pub end: usize,
}

/// Collects every property container of `text`, in source order.
pub fn property_containers(text: &str) -> Vec<PropertyContainer> {
	let tokens: Vec<(HostToken, Range<usize>)> =
		HostToken::lexer(text).spanned().filter(|(t, _)| !t.is_trivia()).collect();

	let mut containers = Vec::new();

	for (i, (token, span)) in tokens.iter().enumerate() {
		if *token != HostToken::KwNew {
			continue;
		}

		let Some((HostToken::Identifier, ident_span)) = tokens.get(i + 1).map(|(t, s)| (*t, s.clone())) else {
			continue;
		};
		if !text[ident_span.clone()].ends_with("Props") {
			continue;
		}

		// The container ends at the close of the initializer or argument list
		// that follows the type name.
		let Some(end) = container_end(&tokens, i + 2) else { continue };
		containers.push(PropertyContainer { start: span.start, type_end: ident_span.end, end });
	}

	containers
}

/// Determines whether a diagnostic at `offset` sits in property-container
/// context: on the creation head (`new <Ident>Props`) itself, or on an
/// initializer property name (an identifier followed by `=` inside a container).
/// Returns the offset of the owning container's `new` keyword.
pub fn property_context(text: &str, offset: usize) -> Option<usize> {
	let containers = property_containers(text);

	if let Some(container) =
		containers.iter().filter(|c| c.start <= offset && offset < c.type_end).min_by_key(|c| c.end - c.start)
	{
		return Some(container.start);
	}

	// An identifier at `offset` whose next significant token is `=`.
	let tokens: Vec<(HostToken, Range<usize>)> =
		HostToken::lexer(text).spanned().filter(|(t, _)| !t.is_trivia()).collect();
	let at = tokens.iter().position(|(t, s)| *t == HostToken::Identifier && s.start <= offset && offset < s.end)?;
	if tokens.get(at + 1).map(|(t, _)| *t) != Some(HostToken::Equals) {
		return None;
	}

	let name_start = tokens[at].1.start;
	containers
		.iter()
		.filter(|c| c.type_end <= name_start && name_start < c.end)
		.min_by_key(|c| c.end - c.start)
		.map(|c| c.start)
}

fn container_end(tokens: &[(HostToken, Range<usize>)], from: usize) -> Option<usize> {
	let (open, close) = match tokens.get(from)? {
		(HostToken::OpenBrace, _) => (HostToken::OpenBrace, HostToken::CloseBrace),
		(HostToken::OpenParen, _) => (HostToken::OpenParen, HostToken::CloseParen),
		_ => return None,
	};

	let mut depth = 0usize;
	for (token, span) in &tokens[from..] {
		if *token == open {
			depth += 1;
		} else if *token == close {
			depth -= 1;
			if depth == 0 {
				return Some(span.end);
			}
		}
	}

	None
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	#[test]
	fn markup_parenthesis_qualifies() {
		let tree = parse_host("var e = (<div/>);");
		assert_eq!(tree.parens.len(), 1);
		assert!(tree.parens[0].opens_markup);
		assert_eq!(tree.parens[0].open, 8);
	}

	#[test]
	fn arithmetic_comparison_does_not_qualify() {
		let tree = parse_host("var b = (a < b);");
		assert_eq!(tree.parens.len(), 1);
		assert!(!tree.parens[0].opens_markup);
	}

	#[test]
	fn chevron_followed_by_number_does_not_qualify() {
		let tree = parse_host("var b = (< 5);");
		assert!(!tree.parens[0].opens_markup);
	}

	#[test]
	fn parens_inside_strings_and_comments_are_ignored() {
		let tree = parse_host(r#"var s = "(<div/>)"; // (<div/>)"#);
		assert_eq!(tree.parens.len(), 0);
	}

	#[test]
	fn nested_parens_only_qualify_the_inner_one() {
		let tree = parse_host("var e = ((<div/>));");
		assert_eq!(tree.parens.len(), 2);
		assert!(!tree.parens[0].opens_markup);
		assert!(tree.parens[1].opens_markup);
	}

	#[test]
	fn identifiers_are_distinct_and_ordered() {
		assert_eq!(identifiers("var x = f(x, y);"), vec!["var", "x", "f", "y"]);
	}

	#[test]
	fn property_name_is_container_context() {
		let text = r#"Document.CreateElement("div", new DivProps { Onclick = H })"#;
		let new_at = text.find("new").unwrap();
		let onclick_at = text.find("Onclick").unwrap();

		assert_eq!(property_context(text, onclick_at), Some(new_at));
	}

	#[test]
	fn type_name_is_container_context() {
		let text = r#"Document.CreateElement("div", new DivProps())"#;
		let new_at = text.find("new").unwrap();
		let type_at = text.find("DivProps").unwrap();

		assert_eq!(property_context(text, type_at), Some(new_at));
		assert_eq!(property_context(text, new_at), Some(new_at));
	}

	#[test]
	fn property_value_is_not_container_context() {
		let text = r#"Document.CreateElement("btn", new BtnProps { Onclick = H })"#;
		let h_at = text.find("= H").unwrap() + 2;

		assert_eq!(property_context(text, h_at), None);
		assert_eq!(property_context(text, 0), None);
	}

	#[test]
	fn innermost_container_wins() {
		let text = "new OuterProps { A = new InnerProps { B = 1 } }";
		let inner = text.find("new Inner").unwrap();
		let b_at = text.find('B').unwrap();

		assert_eq!(property_context(text, b_at), Some(inner));
	}
}
