//! Builds the markup tree from the token vector.
//!
//! A hand-written recursive-descent consumer with a monotone cursor. The builder
//! never re-reads a token, and it never fails: malformed input produces the partial
//! tree that could be assembled, with elements closed at the last consumed token.

use crate::ast::{AstNode, ElementNode, ExpressionNode, StringLiteralNode};
use crate::lexer::{lex, Token, TokenKind};

/// Builds the node list for `tokens` over the backing span `src`.
///
/// `base` is the `start_offset` that was supplied to the lexer, so that token
/// offsets can be projected back into `src`.
pub fn build(tokens: &[Token], src: &str, base: usize) -> Vec<AstNode> {
	let mut builder = Builder { tokens, src, base, i: 0 };
	let mut nodes = Vec::new();

	loop {
		nodes.append(&mut builder.parse_siblings());

		// A structural break or an unmatched closing tag at the top level; skip
		// one token and resume.
		if builder.i < builder.tokens.len() {
			builder.i += 1;
		} else {
			break;
		}
	}

	nodes
}

struct Builder<'a> {
	tokens: &'a [Token],
	src: &'a str,
	base: usize,
	i: usize,
}

fn contains_markup(text: &str) -> bool {
	if !text.contains('>') {
		return false;
	}

	let bytes = text.as_bytes();
	bytes.iter().enumerate().any(|(i, &b)| {
		b == b'<'
			&& bytes
				.get(i + 1)
				.map(|&n| n.is_ascii_alphanumeric() || n == b'-' || n == b'_')
				.unwrap_or(false)
	})
}

impl<'a> Builder<'a> {
	fn text(&self, token: &Token) -> &'a str { &self.src[token.start - self.base..token.end - self.base] }

	fn peek(&self) -> Option<Token> { self.tokens.get(self.i).copied() }

	fn peek_kind(&self) -> Option<TokenKind> { self.peek().map(|t| t.kind) }

	/// Accumulates sibling nodes until a closing tag, a structural break, or the
	/// end of the tokens. The blocking token is left for the caller.
	fn parse_siblings(&mut self) -> Vec<AstNode> {
		let mut nodes = Vec::new();
		while self.i < self.tokens.len() {
			match self.parse_node() {
				Some(node) => nodes.push(node),
				None => break,
			}
		}
		nodes
	}

	fn parse_node(&mut self) -> Option<AstNode> {
		loop {
			let token = self.peek()?;

			match token.kind {
				TokenKind::TagOpen => {
					if self.text(&token) == "<" {
						return Some(self.parse_element());
					}
					return None; // A closing tag; the caller decides.
				}
				TokenKind::AttributeExpression => return Some(self.parse_expression_node()),
				TokenKind::AttributeName | TokenKind::AttributeStringLiteral => {
					self.i += 1;
					let raw = self.text(&token);
					if raw.trim().is_empty() {
						continue;
					}
					return Some(AstNode::StringLiteral(StringLiteralNode {
						value: raw.to_string(),
						source_start: token.start,
						source_end: token.end,
					}));
				}
				TokenKind::RightParen | TokenKind::Semicolon => return None,
				// Anything else is out of position here; skip it and continue.
				_ => self.i += 1,
			}
		}
	}

	fn parse_element(&mut self) -> AstNode {
		let open = self.tokens[self.i];
		self.i += 1;

		let mut element = ElementNode {
			tag_name: String::new(),
			attributes: Vec::new(),
			children: Vec::new(),
			source_start: open.start,
			source_end: open.end,
		};

		if let Some(token) = self.peek() {
			if token.kind == TokenKind::TagName {
				element.tag_name = self.text(&token).to_string();
				element.source_end = token.end;
				self.i += 1;
			}
		}

		// The attribute loop runs until the tag close bracket.
		let self_closed = loop {
			let Some(token) = self.peek() else { return AstNode::Element(element) };

			match token.kind {
				TokenKind::TagClose => {
					self.i += 1;
					element.source_end = token.end;
					break self.text(&token) == "/>";
				}
				TokenKind::AttributeName => {
					self.i += 1;
					let name = self.text(&token).to_string();
					element.source_end = token.end;
					let value = self.parse_attribute_value(&mut element);
					element.attributes.push((name, value));
				}
				TokenKind::AttributeExpression => {
					// A bare expression in attribute position has no name slot in
					// the factory call; consume and drop it.
					let _ = self.parse_expression_node();
				}
				TokenKind::AttributeEquals => self.i += 1,
				// The close bracket never arrived.
				_ => return AstNode::Element(element),
			}
		};

		if self_closed {
			return AstNode::Element(element);
		}

		element.children = self.parse_siblings();
		if let Some(last) = element.children.last() {
			element.source_end = last.source_end();
		}

		// The matching closing tag, if it is the one that stopped the sibling loop.
		if let (Some(close), Some(name)) = (self.peek(), self.tokens.get(self.i + 1).copied()) {
			if close.kind == TokenKind::TagOpen
				&& self.text(&close) == "</"
				&& name.kind == TokenKind::TagName
				&& self.text(&name) == element.tag_name
			{
				self.i += 2;
				element.source_end = name.end;
				if self.peek_kind() == Some(TokenKind::TagClose) {
					element.source_end = self.tokens[self.i].end;
					self.i += 1;
				}
			}
			// A mismatched closer stays unconsumed so an outer element can match it.
		}

		AstNode::Element(element)
	}

	fn parse_attribute_value(&mut self, element: &mut ElementNode) -> Option<AstNode> {
		if self.peek_kind() != Some(TokenKind::AttributeEquals) {
			return None; // A bare attribute; the value slot stays unresolved.
		}
		self.i += 1;

		match self.peek_kind() {
			Some(TokenKind::AttributeStringLiteral) | Some(TokenKind::AttributeName) => {
				let token = self.tokens[self.i];
				self.i += 1;
				element.source_end = token.end;
				Some(AstNode::StringLiteral(StringLiteralNode {
					value: self.text(&token).to_string(),
					source_start: token.start,
					source_end: token.end,
				}))
			}
			Some(TokenKind::AttributeExpression) => {
				let node = self.parse_expression_node();
				element.source_end = node.source_end();
				Some(node)
			}
			_ => None,
		}
	}

	/// Builds an [`ExpressionNode`] from the current [`TokenKind::AttributeExpression`].
	///
	/// Two hybrid shapes are recognized: a single token whose text embeds complete
	/// markup (re-lexed in place), and the bridged lambda, where the lexer split the
	/// expression around nested markup. In the bridged shape the parenthesis and the
	/// parameter text are folded into the head, the markup becomes the children, and
	/// the tail segment is appended to the text so the generator can re-close what
	/// the head opened.
	fn parse_expression_node(&mut self) -> AstNode {
		let token = self.tokens[self.i];
		self.i += 1;

		let raw = self.text(&token).to_string();
		let mut node = ExpressionNode {
			text: raw.clone(),
			children: Vec::new(),
			source_start: token.start,
			source_end: token.end,
		};

		if raw.starts_with('{') && raw.ends_with('}') && contains_markup(&raw) {
			let inner_start = token.start + 1;
			let inner = &self.src[inner_start - self.base..token.end - 1 - self.base];
			let inner_tokens = lex(inner, inner_start, true);
			let mut inner_builder = Builder { tokens: &inner_tokens, src: self.src, base: self.base, i: 0 };

			node.children = build_all(&mut inner_builder);
			let header = inner.split('<').next().unwrap_or("").trim();
			node.text = format!("{{{}", header);

			// Trailing parens of the interior survive on the text so the generator
			// knows how many closers the head still owes.
			let trailing = inner.trim_end().bytes().rev().take_while(|&b| b == b')').count();
			for _ in 0..trailing {
				node.text.push(')');
			}
		} else if raw.starts_with('{') && !raw.ends_with('}') && self.peek_kind() == Some(TokenKind::LeftParen) {
			let paren = self.tokens[self.i];
			self.i += 1;
			node.text.push('(');
			node.source_end = paren.end;

			// Parameter text between the parenthesis and the first tag.
			while let Some(next) = self.peek() {
				if next.kind != TokenKind::AttributeName {
					break;
				}
				node.text.push_str(self.text(&next));
				node.source_end = next.end;
				self.i += 1;
			}

			loop {
				match self.peek() {
					Some(next) if next.kind == TokenKind::AttributeExpression => {
						self.i += 1;
						node.text.push_str(self.text(&next));
						node.source_end = next.end;
						break;
					}
					Some(next) if next.kind == TokenKind::TagOpen && self.text(&next) == "</" => break,
					Some(next) if next.kind == TokenKind::RightParen => break,
					Some(next) if next.kind == TokenKind::Semicolon => break,
					None => break,
					_ => match self.parse_node() {
						Some(child) => {
							node.source_end = child.source_end();
							node.children.push(child);
						}
						None => break,
					},
				}
			}
		}

		if !node.children.is_empty() {
			while self.peek_kind() == Some(TokenKind::RightParen) {
				let paren = self.tokens[self.i];
				self.i += 1;
				node.text.push(')');
				node.source_end = paren.end;
			}
		}

		AstNode::Expression(node)
	}
}

fn build_all(builder: &mut Builder<'_>) -> Vec<AstNode> {
	let mut nodes = Vec::new();
	loop {
		nodes.append(&mut builder.parse_siblings());
		if builder.i < builder.tokens.len() {
			builder.i += 1;
		} else {
			break;
		}
	}
	nodes
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	fn build_str(src: &str) -> Vec<AstNode> { build(&lex(src, 0, true), src, 0) }

	fn single_element(src: &str) -> ElementNode {
		let mut nodes = build_str(src);
		assert_eq!(nodes.len(), 1, "expected one node from {src:?}");
		match nodes.remove(0) {
			AstNode::Element(e) => e,
			other => panic!("expected an element, got {other:?}"),
		}
	}

	#[test]
	fn self_closing_element_spans_the_whole_tag() {
		let element = single_element("<t/>");
		assert_eq!(element.tag_name, "t");
		assert_eq!(element.children, vec![]);
		assert_eq!((element.source_start, element.source_end), (0, 4));
	}

	#[test]
	fn attributes_preserve_lexical_order() {
		let element = single_element(r#"<a href="x" target="y" rel="z"/>"#);
		let names: Vec<&str> = element.attributes.iter().map(|(n, _)| n.as_str()).collect();
		assert_eq!(names, vec!["href", "target", "rel"]);
	}

	#[test]
	fn quoted_attribute_value_keeps_its_quotes() {
		let element = single_element(r#"<a key="a\"b"/>"#);
		match &element.attributes[0].1 {
			Some(AstNode::StringLiteral(s)) => assert_eq!(s.value, r#""a\"b""#),
			other => panic!("expected a string literal value, got {other:?}"),
		}
	}

	#[test]
	fn bare_attribute_has_no_value() {
		let element = single_element("<input disabled/>");
		assert_eq!(element.attributes[0].0, "disabled");
		assert!(element.attributes[0].1.is_none());
	}

	#[test]
	fn children_are_ordered_and_whitespace_is_dropped() {
		let element = single_element("<div>hello<span/> </div>");
		assert_eq!(element.children.len(), 2);
		assert!(matches!(&element.children[0], AstNode::StringLiteral(s) if s.value == "hello"));
		assert!(matches!(&element.children[1], AstNode::Element(e) if e.tag_name == "span"));
	}

	#[test]
	fn bridged_lambda_builds_one_hybrid_expression() {
		let element = single_element("<ul>{xs.Map(x => <li/>)}</ul>");
		assert_eq!(element.children.len(), 1);

		match &element.children[0] {
			AstNode::Expression(x) => {
				assert_eq!(x.children.len(), 1);
				assert!(matches!(&x.children[0], AstNode::Element(e) if e.tag_name == "li"));
				assert_eq!(x.text, "{xs.Map(x => )}");
			}
			other => panic!("expected a hybrid expression, got {other:?}"),
		}
	}

	#[test]
	fn single_token_hybrid_is_re_lexed() {
		let element = single_element("<div>{<p/>}</div>");
		match &element.children[0] {
			AstNode::Expression(x) => {
				assert_eq!(x.children.len(), 1);
				assert_eq!(x.text, "{");
			}
			other => panic!("expected a hybrid expression, got {other:?}"),
		}
	}

	#[test]
	fn plain_expression_keeps_text_verbatim() {
		let element = single_element("<btn onclick={H}/>");
		match &element.attributes[0].1 {
			Some(AstNode::Expression(x)) => {
				assert_eq!(x.text, "{H}");
				assert!(x.children.is_empty());
			}
			other => panic!("expected an expression value, got {other:?}"),
		}
	}

	#[test]
	fn mismatched_closing_tag_recovers() {
		// The stray `</b>` closes nothing; `<i>` is closed at its last child.
		let nodes = build_str("<i>text</b></i>");
		assert_eq!(nodes.len(), 1);
		match &nodes[0] {
			AstNode::Element(e) => {
				assert_eq!(e.tag_name, "i");
				assert_eq!(e.children.len(), 1);
			}
			other => panic!("expected an element, got {other:?}"),
		}
	}

	#[test]
	fn empty_input_builds_nothing() {
		assert_eq!(build_str(""), vec![]);
	}

	#[test]
	fn roundtrip_rebuilds_an_equal_element() {
		let src = r#"<div class="a"><span/>text</div>"#;
		let nodes = build_str(src);
		let element = match &nodes[0] {
			AstNode::Element(e) => e,
			other => panic!("expected an element, got {other:?}"),
		};

		let span = &src[element.source_start..element.source_end];
		let rebuilt = build_str(span);
		assert_eq!(nodes, rebuilt);
	}
}
