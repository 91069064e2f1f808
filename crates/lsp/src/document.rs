//! One source unit's lifecycle: cached text, version marker and analysis.

use crate::diagnostics;
use crate::position::{LineIndex, PositionEncoding};
use crate::semantic_tokens::{self, SemanticTokenSink};
use nako_core::resolve::scan_pragmas;
use nako_core::{
    analyze, AnalyzerConfig, Analysis, DeclarationTable, ErrorInfo, ExternalInfo, ImportResolver,
    Token,
};
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

/// Generations are process-wide so a reopened document never repeats a
/// generation a dependent already recorded.
static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

fn next_generation() -> u64 {
    NEXT_GENERATION.fetch_add(1, Ordering::Relaxed)
}

/// What identifies one revision of a document's text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VersionMarker {
    /// Editor-reported version number.
    Version(i32),
    /// File modification time.
    Modified(SystemTime),
    /// HTTP `ETag` or `Last-Modified` value.
    Tag(String),
    /// SHA-256 of the text, when nothing better is available.
    Digest(String),
}

impl VersionMarker {
    pub fn digest(text: &str) -> Self {
        VersionMarker::Digest(format!("{:x}", Sha256::digest(text.as_bytes())))
    }
}

/// Cached analysis of one document.
#[derive(Debug)]
pub struct Document {
    uri: String,
    text: String,
    marker: Option<VersionMarker>,
    analysis: Option<Analysis>,
    snapshot: Arc<DeclarationTable>,
    generation: u64,
}

impl Document {
    pub fn new(uri: &str) -> Self {
        Document {
            uri: uri.to_owned(),
            text: String::new(),
            marker: None,
            analysis: None,
            snapshot: Arc::new(DeclarationTable::new(uri, DeclarationTable::module_name(uri))),
            generation: 0,
        }
    }

    /// Re-analyse when the text, its marker or any dependency snapshot
    /// changed. Returns whether analysis ran.
    pub fn update_text(
        &mut self,
        text: &str,
        marker: VersionMarker,
        imports: &dyn ImportResolver,
        catalog: &DeclarationTable,
        config: &AnalyzerConfig,
    ) -> bool {
        if let Some(analysis) = &self.analysis {
            if self.marker.as_ref() == Some(&marker)
                && self.text == text
                && !self.dependencies_changed(analysis, imports)
            {
                tracing::trace!(uri = %self.uri, "unchanged; analysis skipped");
                return false;
            }
        }

        let analysis = analyze(text, &self.uri, imports, catalog, config);
        self.snapshot = Arc::new(analysis.table.clone());
        self.generation = next_generation();
        self.text = text.to_owned();
        self.marker = Some(marker);
        tracing::debug!(
            uri = %self.uri,
            generation = self.generation,
            diagnostics = analysis.diagnostics.len(),
            "document analysed"
        );
        self.analysis = Some(analysis);
        true
    }

    /// Re-analyse the cached text if a dependency moved on.
    pub fn refresh(
        &mut self,
        imports: &dyn ImportResolver,
        catalog: &DeclarationTable,
        config: &AnalyzerConfig,
    ) -> bool {
        let Some(marker) = self.marker.clone() else {
            return false;
        };
        let text = self.text.clone();
        self.update_text(&text, marker, imports, catalog, config)
    }

    fn dependencies_changed(&self, analysis: &Analysis, imports: &dyn ImportResolver) -> bool {
        let current: Vec<(String, u64)> = scan_pragmas(&analysis.tokens)
            .imports
            .iter()
            .filter_map(|import| imports.resolve_import(&self.uri, import))
            .map(|e| (e.uri, e.generation))
            .collect();
        current != analysis.dependency_stamp()
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn marker(&self) -> Option<&VersionMarker> {
        self.marker.as_ref()
    }

    /// Increases with every analysis; 0 before the first one.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn analysis(&self) -> Option<&Analysis> {
        self.analysis.as_ref()
    }

    pub fn tokens(&self) -> &[Token] {
        self.analysis.as_ref().map_or(&[], |a| a.tokens.as_slice())
    }

    pub fn diagnostics(&self) -> &[ErrorInfo] {
        self.analysis.as_ref().map_or(&[], |a| a.diagnostics.as_slice())
    }

    /// Diagnostics with ranges in `encoding`.
    pub fn lsp_diagnostics(&self, encoding: PositionEncoding) -> Vec<lsp_types::Diagnostic> {
        diagnostics::to_diagnostics(self.diagnostics(), &self.line_index(encoding))
    }

    pub fn line_index(&self, encoding: PositionEncoding) -> LineIndex {
        LineIndex::new(&self.text, encoding)
    }

    pub fn declarations(&self) -> &DeclarationTable {
        &self.snapshot
    }

    /// Immutable view of this document's declarations for importers.
    pub fn external_info(&self) -> ExternalInfo {
        ExternalInfo {
            uri: self.uri.clone(),
            path: crate::source::uri_to_path(&self.uri),
            table: Arc::clone(&self.snapshot),
            generation: self.generation,
        }
    }

    /// Push highlighting tuples for every classified token, in ascending
    /// document order, with columns in `encoding`.
    pub fn semantic_tokens(&self, encoding: PositionEncoding, sink: &mut dyn SemanticTokenSink) {
        semantic_tokens::emit(self.tokens(), &self.line_index(encoding), sink);
    }
}
