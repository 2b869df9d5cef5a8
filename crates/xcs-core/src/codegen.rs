//! Emits factory-call host code for a markup tree.
//!
//! Each element becomes `F.M("tag", new <Pascal>Props { … }, child…)`. The emitted
//! offsets are recorded as local [`SourceMapEntry`] values: `original_*` offsets are
//! in the coordinate space the builder's nodes carry, `transformed_*` offsets are
//! zero-based within the generated string.

use crate::ast::{AstNode, ElementNode, ExpressionNode, StringLiteralNode};
use crate::source_map::SourceMapEntry;

/// The indentation unit. The exact width is an internal constant; it only needs to
/// be consistent within a run.
const INDENT: &str = "    ";

/// The output of one generator run over a markup region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generated {
	pub code: String,
	pub maps: Vec<SourceMapEntry>,
}

/// Generates host code for `nodes`, calling `factory.method(…)` per element.
pub fn generate(nodes: &[AstNode], factory: &str, method: &str) -> Generated {
	let mut generator = Generator { factory, method, out: String::new(), maps: Vec::new() };

	let visible: Vec<&AstNode> = nodes.iter().filter(|n| !n.is_blank_text()).collect();
	for (index, node) in visible.into_iter().enumerate() {
		if index > 0 {
			generator.out.push_str(",\n");
		}
		generator.emit_node(node, 0);
	}

	Generated { code: generator.out, maps: generator.maps }
}

/// Upper-cases the first code point and keeps the rest verbatim.
pub fn pascal_case(name: &str) -> String {
	let mut chars = name.chars();
	match chars.next() {
		Some(first) => first.to_uppercase().chain(chars).collect(),
		None => String::new(),
	}
}

struct Generator<'a> {
	factory: &'a str,
	method: &'a str,
	out: String,
	maps: Vec<SourceMapEntry>,
}

/// Strips the delimiting braces from an expression's raw text and trims it.
/// Returns the stripped text together with the number of leading bytes removed,
/// so that the caller can compute the original offset of what remains.
fn strip_braces(text: &str) -> (&str, usize) {
	let mut inner = text;
	let mut lead = 0;

	if inner.starts_with('{') {
		inner = &inner[1..];
		lead += 1;
	}
	if inner.ends_with('}') {
		inner = &inner[..inner.len() - 1];
	}

	let trimmed = inner.trim_start();
	lead += inner.len() - trimmed.len();
	(trimmed.trim_end(), lead)
}

fn escape_text(value: &str) -> String {
	let mut escaped = String::with_capacity(value.len());
	for c in value.chars() {
		match c {
			'\\' => escaped.push_str("\\\\"),
			'"' => escaped.push_str("\\\""),
			_ => escaped.push(c),
		}
	}
	escaped
}

impl<'a> Generator<'a> {
	fn indent(&mut self, depth: usize) {
		for _ in 0..depth {
			self.out.push_str(INDENT);
		}
	}

	fn map(&mut self, original_start: usize, original_end: usize, transformed_start: usize) {
		self.maps.push(SourceMapEntry::new(original_start, original_end, transformed_start, self.out.len()));
	}

	fn emit_node(&mut self, node: &AstNode, depth: usize) {
		match node {
			AstNode::Element(element) => self.emit_element(element, depth),
			AstNode::Expression(expression) => self.emit_expression(expression, depth),
			AstNode::StringLiteral(text) => self.emit_text(text),
		}
	}

	fn emit_element(&mut self, element: &ElementNode, depth: usize) {
		let start = self.out.len();
		self.out.push_str(self.factory);
		self.out.push('.');
		self.out.push_str(self.method);
		self.out.push_str("(\n");
		self.indent(depth + 1);

		// The tag name gets its own entry so tag highlighting can be derived.
		let tag_start = self.out.len();
		self.out.push('"');
		self.out.push_str(&element.tag_name);
		self.out.push('"');
		self.map(element.source_start + 1, element.source_start + 1 + element.tag_name.len(), tag_start);

		self.out.push_str(",\n");
		self.indent(depth + 1);
		self.out.push_str("new ");
		self.out.push_str(&pascal_case(&element.tag_name));
		self.out.push_str("Props");

		if element.attributes.is_empty() {
			self.out.push_str("()");
		} else {
			self.out.push_str(" { ");
			for (index, (name, value)) in element.attributes.iter().enumerate() {
				if index > 0 {
					self.out.push_str(", ");
				}
				self.out.push_str(&pascal_case(name));
				self.out.push_str(" = ");
				self.emit_attribute_value(value.as_ref(), depth + 1);
			}
			self.out.push_str(" }");
		}

		let visible: Vec<&AstNode> = element.children.iter().filter(|c| !c.is_blank_text()).collect();
		for child in visible {
			self.out.push('\n');
			self.indent(depth + 1);
			self.out.push_str(", ");
			self.emit_node(child, depth + 1);
		}

		self.out.push('\n');
		self.indent(depth);
		self.out.push(')');
		self.map(element.source_start, element.source_end, start);
	}

	fn emit_attribute_value(&mut self, value: Option<&AstNode>, depth: usize) {
		match value {
			// An unresolved value slot.
			None => self.out.push_str("null"),
			Some(AstNode::StringLiteral(literal)) => {
				// Quoted in the source; the original quotes and escapes are reused.
				let start = self.out.len();
				self.out.push_str(&literal.value);
				self.map(literal.source_start, literal.source_end, start);
			}
			Some(AstNode::Expression(expression)) => self.emit_expression(expression, depth),
			Some(AstNode::Element(element)) => self.emit_element(element, depth),
		}
	}

	fn emit_expression(&mut self, expression: &ExpressionNode, depth: usize) {
		let (text, lead) = strip_braces(&expression.text);
		let original = expression.source_start + lead;

		if expression.children.is_empty() {
			let start = self.out.len();
			self.out.push_str(text);
			self.map(original, original + text.len(), start);
			return;
		}

		// A hybrid expression: the head runs up to and including the arrow (or up
		// to the first `<` when there is no arrow), then the nested markup is
		// emitted inside a fresh parenthesis.
		let head = match text.find("=>") {
			Some(arrow) => &text[..arrow + 2],
			None => match text.find('<') {
				Some(lt) => &text[..lt],
				None => text,
			},
		};

		if !head.is_empty() {
			let start = self.out.len();
			self.out.push_str(head);
			self.map(original, original + head.len(), start);
		}

		self.out.push_str(" (");
		let visible: Vec<&AstNode> = expression.children.iter().filter(|c| !c.is_blank_text()).collect();
		for (index, child) in visible.into_iter().enumerate() {
			if index > 0 {
				self.out.push(',');
			}
			self.out.push('\n');
			self.indent(depth + 1);
			self.emit_node(child, depth + 1);
		}
		self.out.push('\n');
		self.indent(depth);
		self.out.push(')');

		// Close whatever the head left open, so the emitted call is balanced.
		let open = head.matches('(').count().saturating_sub(head.matches(')').count());
		for _ in 0..open {
			self.out.push(')');
		}
	}

	fn emit_text(&mut self, literal: &StringLiteralNode) {
		let value = literal.value.trim();
		if value.is_empty() {
			return;
		}

		let lead = literal.value.len() - literal.value.trim_start().len();
		let start = self.out.len();
		self.out.push('"');
		self.out.push_str(&escape_text(value));
		self.out.push('"');
		self.map(literal.source_start + lead, literal.source_start + lead + value.len(), start);
	}
}
