//! Finds embedded markup regions in a host file.

use itertools::Itertools;
use xcs_abstractions::tracing::warn;

use crate::host::{parse_host, HostSyntaxTree};

/// Walks the parenthesized expressions of `tree` and yields the absolute byte
/// range of every embedded markup region, bounded at the first `<` and one past
/// the last `>` so that the wrapping parenthesis and any trailing host syntax are
/// excluded. Ranges are sorted ascending by their start.
pub fn locate_regions(source: &str, tree: &HostSyntaxTree) -> Vec<(usize, usize)> {
	let mut regions = Vec::new();

	for node in &tree.parens {
		if !node.opens_markup {
			continue;
		}

		let Some(xml_start) = source[node.open..].find('<').map(|i| node.open + i) else { continue };

		// The host scanner's close position can include trailing trivia; derive
		// the matching parenthesis from the raw text instead.
		let Some(close) = matching_paren(source, node.open) else {
			warn!(open = node.open, "Markup region has no balanced closing parenthesis; skipping.");
			continue;
		};

		let Some(xml_end) = source[node.open..close].rfind('>').map(|i| node.open + i + 1) else { continue };

		if xml_start < xml_end {
			regions.push((xml_start, xml_end));
		}
	}

	regions.into_iter().sorted_by_key(|&(start, _)| start).collect()
}

/// Convenience wrapper that scans `source` and locates its regions in one step.
pub fn locate(source: &str) -> Vec<(usize, usize)> { locate_regions(source, &parse_host(source)) }

/// Scans forward from the `(` at `open`, tracking parenthesis balance in the raw
/// text. String literals are skipped so that quoted parentheses do not count.
fn matching_paren(source: &str, open: usize) -> Option<usize> {
	let bytes = source.as_bytes();
	let mut depth = 0usize;
	let mut i = open;

	while i < bytes.len() {
		match bytes[i] {
			b'(' => depth += 1,
			b')' => {
				depth -= 1;
				if depth == 0 {
					return Some(i);
				}
			}
			b'"' => {
				i += 1;
				while i < bytes.len() {
					match bytes[i] {
						b'\\' => i += 1,
						b'"' => break,
						_ => {}
					}
					i += 1;
				}
			}
			_ => {}
		}
		i += 1;
	}

	None
}
