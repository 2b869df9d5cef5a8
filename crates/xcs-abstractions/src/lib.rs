// Export the Language Server Protocol types.
pub use lsp_types;

// Re-export `tracing` and `async_trait` so that the service crates share a single version.
pub use async_trait;
pub use tracing;

pub mod fs;
