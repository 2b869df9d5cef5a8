use std::path::PathBuf;

xflags::xflags! {
	/// An analyzer and compiler for host-language sources with embedded markup
	/// (`.xcs` files), producing derived host files and source maps.
	cmd xcs-analyzer {
		/// Optional path to a folder where a log file will be written.
		optional --logpath path: PathBuf

		/// Optional log level to apply when writing to the log file. Defaults to 'debug'.
		optional --loglevel level: String

		/// Displays the version number.
		optional -v,--version

		/// Starts the Language Server Protocol server instead of the one-shot compiler.
		optional --lsp

		/// The workspace (project root) to operate on. Must exist.
		optional --workspace path: PathBuf

		/// Runs the in-memory self-test and exits.
		optional --dev
	}
}
