//! Projects diagnostics raised against derived files back onto the original
//! source coordinates.

use std::collections::HashSet;
use std::path::PathBuf;

use xcs_abstractions::lsp_types::{Diagnostic, DiagnosticSeverity, NumberOrString, Range};
use xcs_core::host::property_context;
use xcs_core::position::LineIndex;
use xcs_core::source_map::lookup;

use crate::workspace::FileMetadata;

/// A diagnostic as reported by the downstream compiler, in derived-file
/// coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDiagnostic {
	pub file: PathBuf,
	pub start_offset: usize,
	pub length: usize,
	pub code: String,
	pub severity: RawSeverity,
	pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawSeverity {
	Error,
	Warning,
	Information,
	Hint,
}

impl From<RawSeverity> for DiagnosticSeverity {
	fn from(severity: RawSeverity) -> Self {
		match severity {
			RawSeverity::Error => DiagnosticSeverity::ERROR,
			RawSeverity::Warning => DiagnosticSeverity::WARNING,
			RawSeverity::Information => DiagnosticSeverity::INFORMATION,
			RawSeverity::Hint => DiagnosticSeverity::HINT,
		}
	}
}

/// Translates one derived-file diagnostic into original-file coordinates.
///
/// Returns [`None`] when the diagnostic is suppressed, or when no map entry
/// precedes its position (dropping is better than mis-reporting).
pub fn translate(
	diagnostic: &RawDiagnostic,
	metadata: &FileMetadata,
	source: &str,
	suppressed: &HashSet<String>,
) -> Option<Diagnostic> {
	if suppressed.contains(&diagnostic.code) {
		return None;
	}

	// A diagnostic in property-container context is widened to the owning tag,
	// since the property itself does not exist in the original file.
	let container = property_context(&metadata.transformed_content, diagnostic.start_offset);
	let is_prop_error = container.is_some();
	let lookup_pos = container.unwrap_or(diagnostic.start_offset);

	let entry = lookup(&metadata.source_maps, lookup_pos)?;

	let rel = if is_prop_error { 0 } else { lookup_pos.saturating_sub(entry.transformed_start) };
	let mut original_pos = (entry.original_start + rel).min(source.len());

	let width = if is_prop_error {
		if source.as_bytes().get(original_pos) == Some(&b'<') {
			original_pos += 1;
		}
		tag_name_width(source, original_pos)
	} else {
		diagnostic.length.max(1)
	};

	let index = LineIndex::new(source);
	let range = Range {
		start: index.position(original_pos),
		end: index.position((original_pos + width).min(source.len())),
	};

	Some(Diagnostic {
		range,
		severity: Some(diagnostic.severity.into()),
		code: Some(NumberOrString::String(diagnostic.code.clone())),
		source: Some(String::from("xcs")),
		message: diagnostic.message.clone(),
		..Diagnostic::default()
	})
}

/// The width of the tag name at `pos`: the maximal run of letters, digits, `_`
/// and `.`, minimum one.
fn tag_name_width(source: &str, pos: usize) -> usize {
	source.as_bytes()[pos.min(source.len())..]
		.iter()
		.take_while(|&&b| b.is_ascii_alphanumeric() || b == b'_' || b == b'.')
		.count()
		.max(1)
}
