//! The XCS transformation core.
//!
//! Compiles a host-language source file with embedded markup expressions into pure
//! host-language text plus a position map, so that diagnostics raised against the
//! derived text can be projected back onto the original file. The pipeline is
//! locate → lex → build → generate → weave; every stage is CPU-only and runs to
//! completion without yielding, so a transformation is safe on any worker.

pub mod ast;
pub mod builder;
pub mod codegen;
pub mod host;
pub mod lexer;
pub mod locator;
pub mod position;
pub mod source_map;
pub mod weaver;

use std::path::{Path, PathBuf};

pub use source_map::SourceMapEntry;
pub use weaver::FileTransformedPayload;

/// The extension that distinguishes source files carrying embedded markup.
pub const SOURCE_EXTENSION: &str = "xcs";

/// The extension of the derived, pure host-language files.
pub const DERIVED_EXTENSION: &str = "cs";

/// The reserved folder that derived files are written beneath. Paths under it are
/// never treated as sources.
pub const GENERATED_DIR: &str = "Generated";

pub const DEFAULT_FACTORY: &str = "Document";
pub const DEFAULT_METHOD: &str = "CreateElement";

/// Returns `true` when `path` has the distinguished source extension and does not
/// live under the reserved derived folder.
pub fn is_source_path(path: &Path) -> bool {
	path.extension().map(|e| e == SOURCE_EXTENSION).unwrap_or(false)
		&& !path.components().any(|c| c.as_os_str() == GENERATED_DIR)
}

/// Transforms whole source files into derived text plus a global source map.
///
/// The factory and method identifiers are configurable; every element becomes
/// `factory.method("tag", new <Pascal>Props { … }, child…)`.
#[derive(Debug, Clone)]
pub struct Transpiler {
	factory: String,
	method: String,
}

impl Default for Transpiler {
	fn default() -> Self { Self::new(DEFAULT_FACTORY, DEFAULT_METHOD) }
}

impl Transpiler {
	pub fn new(factory: impl Into<String>, method: impl Into<String>) -> Self {
		Self { factory: factory.into(), method: method.into() }
	}

	pub fn factory(&self) -> &str { &self.factory }

	pub fn method(&self) -> &str { &self.method }

	/// Transforms `source`, returning the derived text and its position map.
	pub fn transform(&self, source: &str) -> (String, Vec<SourceMapEntry>) {
		let regions = locator::locate(source);
		weaver::weave(source, &regions, &self.factory, &self.method)
	}

	/// Transforms `source` into the payload consumed by the host layer.
	pub fn transform_file(&self, file: impl Into<PathBuf>, source: &str) -> FileTransformedPayload {
		let (content, source_maps) = self.transform(source);
		FileTransformedPayload { file: file.into(), content, source_maps }
	}
}

#[cfg(test)]
mod tests;
