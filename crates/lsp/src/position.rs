//! Engine columns to LSP positions.
//!
//! The engine counts columns in Unicode scalar values. LSP positions are
//! UTF-16 code units unless the client negotiated otherwise, so a character
//! outside the BMP shifts every later column on its line.

use lsp_types::{Position, PositionEncodingKind, Range};
use nako_core::{Pos, Span};

/// Offset encoding for LSP positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PositionEncoding {
    /// UTF-8 byte offsets.
    Utf8,
    /// UTF-16 code units (LSP default).
    #[default]
    Utf16,
    /// Scalar values, the engine's own unit.
    Utf32,
}

impl PositionEncoding {
    /// Parse from a negotiated LSP position encoding kind.
    pub fn from_lsp(kind: &PositionEncodingKind) -> Option<Self> {
        match kind.as_str() {
            "utf-8" => Some(Self::Utf8),
            "utf-16" => Some(Self::Utf16),
            "utf-32" => Some(Self::Utf32),
            _ => None,
        }
    }

    pub fn to_lsp(self) -> PositionEncodingKind {
        match self {
            Self::Utf8 => PositionEncodingKind::UTF8,
            Self::Utf16 => PositionEncodingKind::UTF16,
            Self::Utf32 => PositionEncodingKind::UTF32,
        }
    }

    fn units(self, c: char) -> u32 {
        match self {
            Self::Utf8 => c.len_utf8() as u32,
            Self::Utf16 => c.len_utf16() as u32,
            Self::Utf32 => 1,
        }
    }
}

/// Per-line column tables for one text.
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Encoded offset before each scalar of the line, plus the line end.
    /// `None` when every scalar on the line is one unit wide.
    lines: Vec<Option<Vec<u32>>>,
}

impl LineIndex {
    pub fn new(text: &str, encoding: PositionEncoding) -> Self {
        let lines = text
            .split('\n')
            .map(|line| {
                if line.chars().all(|c| encoding.units(c) == 1) {
                    return None;
                }
                let mut offsets = Vec::with_capacity(line.len() + 1);
                let mut at = 0;
                offsets.push(at);
                for c in line.chars() {
                    at += encoding.units(c);
                    offsets.push(at);
                }
                Some(offsets)
            })
            .collect();
        LineIndex { lines }
    }

    /// Encoded column of scalar column `col` on `line`. Columns past the
    /// line end count one unit each.
    pub fn column(&self, line: u32, col: u32) -> u32 {
        let Some(Some(offsets)) = self.lines.get(line as usize) else {
            return col;
        };
        match offsets.get(col as usize) {
            Some(&at) => at,
            None => {
                let end = offsets.len().saturating_sub(1) as u32;
                offsets.last().copied().unwrap_or(0) + col.saturating_sub(end)
            }
        }
    }

    /// Encoded width of `len` scalars starting at `col`.
    pub fn width(&self, line: u32, col: u32, len: u32) -> u32 {
        self.column(line, col + len) - self.column(line, col)
    }

    pub fn position(&self, pos: Pos) -> Position {
        Position::new(pos.line, self.column(pos.line, pos.col))
    }

    pub fn range(&self, span: Span) -> Range {
        Range::new(self.position(span.start), self.position(span.end))
    }
}
