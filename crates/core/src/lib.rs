//! nako-core: language engine for Nadesiko3 (`*.nako3`) source.
//!
//! Turns source text into a semantically annotated token stream:
//!
//! - [`lexer`] -- tokens with attached particles (josi), units, indentation
//!   and reserved-word classification
//! - [`link`] -- block structure under the `ここまで` terminator or the
//!   indentation convention
//! - [`resolve`] -- declarations, scopes, references and particle-driven
//!   argument binding, across files
//! - [`analyze()`] -- runs the three passes in order
//!
//! No pass fails on malformed input. Problems are collected as
//! [`ErrorInfo`] diagnostics by a bounded [`ErrorInfoManager`].

pub mod analyze;
pub mod config;
pub mod declare;
pub mod error;
pub mod josi;
pub mod kana;
pub mod lexer;
pub mod link;
pub mod plugin;
pub mod reserved;
pub mod resolve;
pub mod scope;
pub mod token;

// ── Convenience re-exports: key types ────────────────────────────────

pub use config::AnalyzerConfig;
pub use declare::{DeclRef, Declare, DeclarationTable, DeclareKind, ExternalInfo, TableRef};
pub use error::{ErrorInfo, ErrorInfoManager, ErrorLevel, MessageId, NakoError};
pub use link::{BlockId, BlockKind, BlockTree};
pub use scope::ScopeId;
pub use token::{Access, Pos, Span, Token, TokenGroup, TokenKind, TokenRole};

// ── Convenience re-exports: pass entry points ────────────────────────

pub use analyze::{analyze, Analysis, ImportResolver, NoImports};
pub use lexer::lex;
pub use link::link;
pub use resolve::resolve;
