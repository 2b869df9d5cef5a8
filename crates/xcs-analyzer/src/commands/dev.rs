use crate::commands::{Command, CommandInvocationError};
use async_trait::async_trait;
use cancellation::CancellationToken;
use std::{collections::HashSet, path::PathBuf, sync::Arc};
use xcs_core::{SourceMapEntry, Transpiler};
use xcs_host::translate::{translate, RawDiagnostic, RawSeverity};
use xcs_host::workspace::FileMetadata;

/// The in-memory self-test: runs the end-to-end scenarios against the core and
/// reports pass/fail per scenario.
pub struct DevCommand;

struct Scenario {
	name: &'static str,
	source: &'static str,
	expected: &'static [&'static str],
}

const SCENARIOS: &[Scenario] = &[
	Scenario {
		name: "plain element",
		source: "class C { var e = (<div/>); }",
		expected: &["Document.CreateElement(", "\"div\"", "new DivProps()"],
	},
	Scenario {
		name: "expression attribute",
		source: "var e = (<btn onclick={H}/>);",
		expected: &["new BtnProps { Onclick = H }"],
	},
	Scenario {
		name: "nested children",
		source: "var e = (<div>hello<span/></div>);",
		expected: &["\"div\"", "\"hello\"", "\"span\""],
	},
	Scenario {
		name: "lambda with nested markup",
		source: "var e = (<ul>{xs.Map(x => <li/>)}</ul>);",
		expected: &["\"ul\"", "xs.Map(x => (", "\"li\""],
	},
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

fn run_scenario(transpiler: &Transpiler, scenario: &Scenario) -> Result<(), String> {
	let (content, maps) = transpiler.transform(scenario.source);

	for expected in scenario.expected {
		if !content.contains(expected) {
			return Err(format!("missing {expected:?} in derived text"));
		}
	}

	if !coverage_holds(&content, &maps) {
		return Err(String::from("derived bytes without map coverage"));
	}

	Ok(())
}

/// Scenario E: a diagnostic inside the generated attribute assignment projects
/// back onto exactly the attribute value.
fn run_diagnostic_projection() -> Result<(), String> {
	let source = "var e = (<btn onclick={H}/>);";
	let (content, source_maps) = Transpiler::default().transform(source);

	let metadata = FileMetadata {
		target_path: PathBuf::from("/dev/Generated/a.cs"),
		transformed_content: content.clone(),
		source_maps,
	};

	let offset = content.find("Onclick = H").ok_or("missing attribute assignment")? + "Onclick = ".len();
	let diagnostic = RawDiagnostic {
		file: PathBuf::from("/dev/Generated/a.cs"),
		start_offset: offset,
		length: 1,
		code: String::from("CS0103"),
		severity: RawSeverity::Error,
		message: String::from("The name 'H' does not exist in the current context"),
	};

	let translated =
		translate(&diagnostic, &metadata, source, &HashSet::new()).ok_or("diagnostic was dropped")?;

	let expected = source.find('H').ok_or("missing H")? as u32;
	if translated.range.start.character != expected || translated.range.end.character != expected + 1 {
		return Err(format!("projected onto {:?} instead of 'H'", translated.range));
	}

	Ok(())
}

#[async_trait]
impl Command for DevCommand {
	async fn run(&self, _cancel_token: Arc<CancellationToken>) -> Result<(), CommandInvocationError> {
		let transpiler = Transpiler::default();
		let mut failed = false;

		for scenario in SCENARIOS {
			match run_scenario(&transpiler, scenario) {
				Ok(()) => println!("PASS {}", scenario.name),
				Err(reason) => {
					failed = true;
					println!("FAIL {}: {reason}", scenario.name);
				}
			}
		}

		match run_diagnostic_projection() {
			Ok(()) => println!("PASS diagnostic projection"),
			Err(reason) => {
				failed = true;
				println!("FAIL diagnostic projection: {reason}");
			}
		}

		if failed {
			return Err(CommandInvocationError::SelfTestFailed);
		}

		println!("Self-test passed.");
		Ok(())
	}
}
