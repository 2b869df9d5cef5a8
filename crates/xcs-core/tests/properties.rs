//! Universal properties of the transformation, checked over a corpus of inputs
//! through the public API only.

use xcs_core::{SourceMapEntry, Transpiler};

const CORPUS: &[&str] = &[
	"",
	"class C { }",
	"var e = ();",
	"class C { var e = (<div/>); }",
	"var e = (<btn onclick={H}/>);",
	"var e = (<div>hello<span/></div>);",
	"var e = (<ul>{xs.Map(x => <li/>)}</ul>);",
	"var a = (<i/>); var b = (<b/>);",
	"var e = (<a href=\"x\" target=\"y\"/>);",
	"var e = (<div>{<p/>}</div>);",
	"var e = (<div>{cond ? a : b}</div>);",
	"var broken = (<x",
	"var s = \"(<div/>)\";",
];

fn coverage_holds(content: &str, maps: &[SourceMapEntry]) -> bool {
	let mut covered = vec![false; content.len()];
	for entry in maps {
		for flag in &mut covered[entry.transformed_start..entry.transformed_end] {
			*flag = true;
		}
	}
	covered.iter().all(|&c| c)
}

#[test]
fn every_derived_byte_is_covered() {
	let transpiler = Transpiler::default();
	for source in CORPUS {
		let (content, maps) = transpiler.transform(source);
		assert!(coverage_holds(&content, &maps), "coverage gap for {source:?}");
	}
}

#[test]
fn entries_are_ordered_by_transformed_start() {
	let transpiler = Transpiler::default();
	for source in CORPUS {
		let (_, maps) = transpiler.transform(source);
		assert!(
			maps.windows(2).all(|w| w[0].transformed_start <= w[1].transformed_start),
			"unordered map for {source:?}"
		);
	}
}

#[test]
fn reverse_lookup_is_defined_for_every_derived_offset() {
	let transpiler = Transpiler::default();
	for source in CORPUS {
		let (content, maps) = transpiler.transform(source);
		for offset in 0..content.len() {
			let entry = xcs_core::source_map::lookup(&maps, offset);
			assert!(entry.is_some(), "no entry for offset {offset} of {source:?}");
		}
	}
}

#[test]
fn sources_without_markup_are_unchanged() {
	let transpiler = Transpiler::default();
	for source in ["", "class C { }", "var e = ();", "var s = \"(<div/>)\";", "var b = (a < b);"] {
		let (content, maps) = transpiler.transform(source);
		assert_eq!(content, source);
		if !source.is_empty() {
			assert_eq!(maps.len(), 1);
			assert_eq!(maps[0], SourceMapEntry::identity(0, 0, source.len()));
		}
	}
}

#[test]
fn identity_projection_recovers_host_bytes() {
	let transpiler = Transpiler::default();
	for source in CORPUS {
		let (content, maps) = transpiler.transform(source);
		for entry in maps.iter().filter(|e| {
			e.original_end - e.original_start == e.transformed_end - e.transformed_start
				&& source.get(e.original_start..e.original_end) == content.get(e.transformed_start..e.transformed_end)
		}) {
			// Identity entries project byte-for-byte.
			let len = entry.original_end - entry.original_start;
			for delta in 0..len {
				assert_eq!(
					source.as_bytes()[entry.original_start + delta],
					content.as_bytes()[entry.transformed_start + delta]
				);
			}
		}
	}
}
