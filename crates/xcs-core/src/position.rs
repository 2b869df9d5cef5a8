//! Byte-offset to line/column conversion.

use xcs_abstractions::lsp_types::Position;

/// A line index over a text buffer, for converting between byte offsets and
/// `Position` values. Character columns are counted in Unicode scalar values.
pub struct LineIndex<'a> {
	text: &'a str,
	line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
	pub fn new(text: &'a str) -> Self {
		let mut line_starts = vec![0];
		for (i, b) in text.bytes().enumerate() {
			if b == b'\n' {
				line_starts.push(i + 1);
			}
		}
		Self { text, line_starts }
	}

	/// Converts a byte offset to a [`Position`]. Offsets beyond the end of the
	/// buffer clamp to the end; offsets inside a multi-byte character clamp to
	/// its start.
	pub fn position(&self, offset: usize) -> Position {
		let mut offset = offset.min(self.text.len());
		while !self.text.is_char_boundary(offset) {
			offset -= 1;
		}
		let line = match self.line_starts.binary_search(&offset) {
			Ok(line) => line,
			Err(next) => next - 1,
		};

		let line_start = self.line_starts[line];
		let character = self.text[line_start..offset].chars().count();

		Position { line: line as u32, character: character as u32 }
	}

	/// Converts a [`Position`] back to a byte offset. Positions beyond the end of
	/// a line clamp to the end of that line; lines beyond the buffer clamp to the
	/// end of the buffer.
	pub fn offset(&self, position: Position) -> usize {
		let Some(&line_start) = self.line_starts.get(position.line as usize) else {
			return self.text.len();
		};

		let line_end = self
			.line_starts
			.get(position.line as usize + 1)
			.map(|&next| next.saturating_sub(1))
			.unwrap_or(self.text.len());

		let mut offset = line_start;
		let mut remaining = position.character;
		for c in self.text[line_start..line_end].chars() {
			if remaining == 0 {
				break;
			}
			offset += c.len_utf8();
			remaining -= 1;
		}

		offset
	}
}
