//! Editor-facing layer over nako-core.
//!
//! Owns the per-document cache and its re-analysis decision, the project
//! context used for cross-file resolution, asynchronous cancellable text
//! loading, semantic-token encoding and diagnostic conversion. The
//! transport (an LSP server loop) is left to the embedding editor.

pub mod diagnostics;
pub mod document;
pub mod position;
pub mod project;
pub mod semantic_tokens;
pub mod source;

pub use document::{Document, VersionMarker};
pub use position::{LineIndex, PositionEncoding};
pub use project::{Project, TreeLoad};
pub use semantic_tokens::{SemanticTokenSink, SemanticTokensBuilder};
pub use source::{AnySource, Fetched, FileSource, HttpSource, MemorySource, TextSource};
