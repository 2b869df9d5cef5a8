use super::*;
use pretty_assertions::assert_eq;
use std::path::Path;

fn transform(source: &str) -> (String, Vec<SourceMapEntry>) { Transpiler::default().transform(source) }

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
fn source_paths_require_the_extension_and_avoid_generated() {
	assert!(is_source_path(Path::new("src/Views/Home.xcs")));
	assert!(!is_source_path(Path::new("src/Views/Home.cs")));
	assert!(!is_source_path(Path::new("Generated/src/Views/Home.xcs")));
	assert!(!is_source_path(Path::new("src/Generated/Home.xcs")));
}

#[test]
fn pure_host_source_is_unchanged_with_one_identity_entry() {
	let source = "class C { void M() { var x = 1; } }";
	let (content, maps) = transform(source);

	assert_eq!(content, source);
	assert_eq!(maps, vec![SourceMapEntry::identity(0, 0, source.len())]);
}

#[test]
fn plain_element_round_trips() {
	let source = "class C { var e = (<div/>); }";
	let (content, maps) = transform(source);

	assert!(content.contains("Document.CreateElement("));
	assert!(content.contains("\"div\""));
	assert!(content.contains("new DivProps()"));
	assert_total_coverage(&content, &maps);

	// The tag name has a dedicated entry projecting back onto `div`.
	let tag_at = content.find("\"div\"").unwrap();
	let entry = maps
		.iter()
		.find(|e| e.transformed_start == tag_at && e.transformed_end == tag_at + "\"div\"".len())
		.expect("a tag-name entry");
	assert_eq!(&source[entry.original_start..entry.original_end], "div");
}

#[test]
fn expression_attribute_round_trips() {
	let source = "var e = (<btn onclick={H}/>);";
	let (content, maps) = transform(source);

	assert!(content.contains("new BtnProps { Onclick = H }"));
	assert_total_coverage(&content, &maps);

	let value_at = content.find("Onclick = H").unwrap() + "Onclick = ".len();
	let entry = maps
		.iter()
		.find(|e| e.transformed_start == value_at && e.transformed_end == value_at + 1)
		.expect("an attribute-value entry");
	assert_eq!(&source[entry.original_start..entry.original_end], "H");
}

#[test]
fn nested_children_round_trip() {
	let source = "var e = (<div>hello<span/></div>);";
	let (content, maps) = transform(source);

	assert!(content.contains("\"div\""));
	assert!(content.contains("\"hello\""));
	assert!(content.contains("\"span\""));
	assert!(content.contains("new SpanProps()"));
	assert_total_coverage(&content, &maps);
}

#[test]
fn lambda_with_nested_markup_round_trips() {
	let source = "var e = (<ul>{xs.Map(x => <li/>)}</ul>);";
	let (content, maps) = transform(source);

	assert!(content.contains("\"ul\""));
	assert!(content.contains("xs.Map(x => ("));
	assert!(content.contains("\"li\""));
	assert_total_coverage(&content, &maps);

	// Entries exist for the tag, the lambda head, and the nested element.
	for needle in ["ul", "xs.Map(x =>", "li"] {
		let original_at = source.find(needle).unwrap();
		assert!(
			maps.iter().any(|e| e.original_start == original_at),
			"no entry anchored at {needle:?}"
		);
	}

	// The derived expression is parenthesis-balanced.
	assert_eq!(content.matches('(').count(), content.matches(')').count());
}

#[test]
fn surrounding_host_code_is_identity_mapped() {
	let source = "var e = (<div/>); var tail = 1;";
	let (content, maps) = transform(source);

	let tail_original = source.find(" var tail").unwrap();
	let entry = maps.iter().find(|e| e.original_start <= tail_original && tail_original < e.original_end).unwrap();
	let delta = tail_original - entry.original_start;
	let projected = entry.transformed_start + delta;

	assert_eq!(&content[projected..projected + " var tail = 1;".len()], " var tail = 1;");
}

#[test]
fn transform_file_carries_the_path() {
	let payload = Transpiler::default().transform_file("a/b.xcs", "var x = 1;");
	assert_eq!(payload.file, Path::new("a/b.xcs"));
	assert_eq!(payload.content, "var x = 1;");
	assert_eq!(payload.source_maps.len(), 1);
}

#[test]
fn custom_factory_identifiers_are_used() {
	let transpiler = Transpiler::new("Ui", "Make");
	let (content, _) = transpiler.transform("var e = (<div/>);");
	assert!(content.contains("Ui.Make("));
}

#[test]
fn maps_are_monotone_in_transformed_start() {
	let source = "var a = (<i/>);\nvar b = (<div>x</div>);\nvar c = 3;";
	let (content, maps) = transform(source);

	assert!(maps.windows(2).all(|w| w[0].transformed_start <= w[1].transformed_start));
	assert_total_coverage(&content, &maps);
}
