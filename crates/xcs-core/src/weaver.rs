//! Stitches identity-mapped host slices and transformed markup regions into the
//! derived text for one file.

use std::path::PathBuf;

use crate::builder::build;
use crate::codegen::generate;
use crate::lexer::lex;
use crate::source_map::SourceMapEntry;

/// The unit of output of the core: the complete derived text of one file together
/// with the position map spanning all of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTransformedPayload {
	pub file: PathBuf,
	pub content: String,
	pub source_maps: Vec<SourceMapEntry>,
}

/// Weaves `source` and its located `regions` into derived text plus a global map.
///
/// Regions must be sorted by start; a region overlapping an earlier one is
/// skipped. Host bytes outside every region are copied verbatim under identity
/// entries, so every derived byte is covered by at least one entry.
pub fn weave(source: &str, regions: &[(usize, usize)], factory: &str, method: &str) -> (String, Vec<SourceMapEntry>) {
	let mut output = String::with_capacity(source.len());
	let mut maps: Vec<SourceMapEntry> = Vec::new();
	let mut last_pos = 0usize;

	for &(region_start, region_end) in regions {
		if region_start < last_pos {
			continue; // Overlap guard.
		}

		if last_pos < region_start {
			maps.push(SourceMapEntry::identity(last_pos, output.len(), region_start - last_pos));
			output.push_str(&source[last_pos..region_start]);
		}

		let raw = &source[region_start..region_end];
		let (prefix, markup, suffix) = split_region(raw);

		if !prefix.is_empty() {
			maps.push(SourceMapEntry::identity(region_start, output.len(), prefix.len()));
			output.push_str(prefix);
		}

		let markup_offset = region_start + prefix.len();
		let tokens = lex(markup, 0, true);
		let nodes = build(&tokens, markup, 0);
		let generated = generate(&nodes, factory, method);

		if generated.code.is_empty() {
			// Nothing could be transformed; keep the original text verbatim so the
			// downstream compiler reports against the real coordinates.
			if !markup.is_empty() {
				maps.push(SourceMapEntry::identity(markup_offset, output.len(), markup.len()));
				output.push_str(markup);
			}
		} else {
			let code_start = output.len();
			output.push_str(&generated.code);

			// A region-wide entry guarantees that every generated byte is covered,
			// including the separators between root siblings.
			maps.push(SourceMapEntry::new(markup_offset, markup_offset + markup.len(), code_start, output.len()));

			for local in &generated.maps {
				maps.push(SourceMapEntry::new(
					markup_offset + local.original_start,
					markup_offset + local.original_end,
					code_start + local.transformed_start,
					code_start + local.transformed_end,
				));
			}
		}

		if !suffix.is_empty() {
			maps.push(SourceMapEntry::identity(region_end - suffix.len(), output.len(), suffix.len()));
			output.push_str(suffix);
		}

		last_pos = region_end;
	}

	if last_pos < source.len() {
		maps.push(SourceMapEntry::identity(last_pos, output.len(), source.len() - last_pos));
		output.push_str(&source[last_pos..]);
	}

	maps.sort_by_key(|e| (e.transformed_start, e.transformed_end));
	(output, maps)
}

/// Splits a raw region into a leading run of whitespace and `(`, the markup
/// itself, and a trailing run of whitespace and `)`.
///
/// The locator's own ranges are bounded at the first `<` and the last `>`, so for
/// them both runs are empty. `weave` also accepts caller-supplied ranges that
/// still carry the wrapping parenthesis; the wrapper must reach the derived file
/// verbatim but must not reach the markup pipeline.
fn split_region(raw: &str) -> (&str, &str, &str) {
	let bytes = raw.as_bytes();

	let mut start = 0;
	while start < bytes.len() && (bytes[start].is_ascii_whitespace() || bytes[start] == b'(') {
		start += 1;
	}

	let mut end = bytes.len();
	while end > start && (bytes[end - 1].is_ascii_whitespace() || bytes[end - 1] == b')') {
		end -= 1;
	}

	(&raw[..start], &raw[start..end], &raw[end..])
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::locator::locate;
	use pretty_assertions::assert_eq;

	fn weave_source(source: &str) -> (String, Vec<SourceMapEntry>) {
		weave(source, &locate(source), "Document", "CreateElement")
	}

	/// Every derived byte must be covered by at least one entry.
	fn assert_total_coverage(content: &str, maps: &[SourceMapEntry]) {
		let mut covered = vec![false; content.len()];
		for entry in maps {
			for flag in &mut covered[entry.transformed_start..entry.transformed_end] {
				*flag = true;
			}
		}
		if let Some(gap) = covered.iter().position(|&c| !c) {
			panic!("derived byte {gap} is not covered by any map entry");
		}
	}

	#[test]
	fn pure_host_file_is_identity() {
		let source = "class C { int x = 1; }";
		let (content, maps) = weave_source(source);

		assert_eq!(content, source);
		assert_eq!(maps, vec![SourceMapEntry::identity(0, 0, source.len())]);
	}

	#[test]
	fn empty_parenthesis_is_preserved_verbatim() {
		let source = "var e = ();";
		let (content, maps) = weave_source(source);

		assert_eq!(content, source);
		assert_total_coverage(&content, &maps);
	}

	#[test]
	fn plain_element_keeps_the_surrounding_host_code() {
		let source = "class C { var e = (<div/>); }";
		let (content, maps) = weave_source(source);

		assert!(content.starts_with("class C { var e = ("));
		assert!(content.contains("Document.CreateElement("));
		assert!(content.contains("\"div\""));
		assert!(content.ends_with("); }"));
		assert_total_coverage(&content, &maps);
	}

	#[test]
	fn identity_bytes_are_recoverable_through_the_map() {
		let source = "class C { var e = (<div/>); }";
		let (content, maps) = weave_source(source);

		// Every byte before the region maps to itself.
		let region_start = source.find('<').unwrap();
		let head = maps.iter().find(|e| e.original_start == 0).unwrap();
		assert_eq!(head.transformed_start, 0);
		assert_eq!(head.original_end, region_start);
		assert_eq!(&content[head.transformed_start..head.transformed_end], &source[..region_start]);
	}

	#[test]
	fn region_carrying_the_wrapping_parenthesis_keeps_it_verbatim() {
		// A caller-supplied range that spans `(<div/>)` rather than the bare
		// markup: the parenthesis and padding become identity-mapped slices.
		let source = "var e = ( <div/> );";
		let region = (source.find('(').unwrap(), source.rfind(')').unwrap() + 1);

		let (content, maps) = weave(source, &[region], "Document", "CreateElement");

		assert!(content.starts_with("var e = ( "));
		assert!(content.contains("Document.CreateElement("));
		assert!(content.ends_with(" );"));
		assert_total_coverage(&content, &maps);

		// The wrapper `( ` is its own identity entry.
		let prefix = maps
			.iter()
			.find(|e| e.original_start == region.0 && e.original_end == region.0 + 2)
			.expect("an identity entry for the wrapping parenthesis");
		assert_eq!(&content[prefix.transformed_start..prefix.transformed_end], "( ");
	}

	#[test]
	fn overlapping_regions_keep_only_the_first() {
		let source = "var e = (<div/>);";
		let region = (source.find('<').unwrap(), source.rfind('>').unwrap() + 1);
		let overlapping = (region.0 + 1, region.1);

		let (content, maps) = weave(source, &[region, overlapping], "Document", "CreateElement");

		assert_eq!(content.matches("Document.CreateElement").count(), 1);
		assert_total_coverage(&content, &maps);
	}

	#[test]
	fn maps_are_sorted_by_transformed_start() {
		let source = "var a = (<i/>); var b = (<div>text</div>);";
		let (content, maps) = weave_source(source);

		assert!(maps.windows(2).all(|w| w[0].transformed_start <= w[1].transformed_start));
		assert_total_coverage(&content, &maps);
	}

	#[test]
	fn untransformable_region_is_kept_verbatim() {
		// The locator finds the chevron but the region lexes to nothing usable;
		// the weave must still cover it.
		let source = "var e = (<x";
		let (content, maps) = weave_source(source);

		assert_eq!(content, source);
		assert_total_coverage(&content, &maps);
	}
}
