//! Semantic token legend, classification and the LSP delta encoder.
//!
//! Classification reads what the passes already decided about a token
//! (`group`, `fix`, `parse` and `role`); nothing is re-parsed here.
//! Tokens that carry no highlighting meaning (punctuation, line ends,
//! unresolved words) produce no semantic token.

use lsp_types::{SemanticToken, SemanticTokenModifier, SemanticTokenType};
use nako_core::token::ParseKind;
use nako_core::{Access, Pos, TableRef, Token, TokenGroup, TokenKind, TokenRole};

use crate::position::LineIndex;

/// Index into TOKEN_TYPES for each semantic category.
pub const TK_KEYWORD: u32 = 0;
pub const TK_FUNCTION: u32 = 1;
pub const TK_VARIABLE: u32 = 2;
pub const TK_PARAMETER: u32 = 3;
pub const TK_STRING: u32 = 4;
pub const TK_NUMBER: u32 = 5;
pub const TK_COMMENT: u32 = 6;
pub const TK_OPERATOR: u32 = 7;
pub const TK_MACRO: u32 = 8;

/// Semantic token types registered with the client.
pub static TOKEN_TYPES: &[SemanticTokenType] = &[
    SemanticTokenType::KEYWORD,   // 0
    SemanticTokenType::FUNCTION,  // 1
    SemanticTokenType::VARIABLE,  // 2
    SemanticTokenType::PARAMETER, // 3
    SemanticTokenType::STRING,    // 4
    SemanticTokenType::NUMBER,    // 5
    SemanticTokenType::COMMENT,   // 6
    SemanticTokenType::OPERATOR,  // 7
    SemanticTokenType::MACRO,     // 8
];

/// Semantic token modifiers.
pub static TOKEN_MODIFIERS: &[SemanticTokenModifier] = &[
    SemanticTokenModifier::DECLARATION,     // bit 0
    SemanticTokenModifier::DEFINITION,      // bit 1
    SemanticTokenModifier::READONLY,        // bit 2
    SemanticTokenModifier::DEFAULT_LIBRARY, // bit 3
];

pub const MOD_DECLARATION: u32 = 1 << 0;
pub const MOD_DEFINITION: u32 = 1 << 1;
pub const MOD_READONLY: u32 = 1 << 2;
pub const MOD_DEFAULT_LIBRARY: u32 = 1 << 3;

/// The legend to advertise in server capabilities.
pub fn legend() -> lsp_types::SemanticTokensLegend {
    lsp_types::SemanticTokensLegend {
        token_types: TOKEN_TYPES.to_vec(),
        token_modifiers: TOKEN_MODIFIERS.to_vec(),
    }
}

// ──────────────────────────────────────────────
// Sink
// ──────────────────────────────────────────────

/// Receives highlighting tuples in ascending document order. Columns and
/// lengths are in the encoding of the [`LineIndex`] passed to [`emit`].
pub trait SemanticTokenSink {
    fn push(&mut self, line: u32, col: u32, len: u32, token_type: u32, modifiers: u32);
}

/// A raw token with absolute position before delta-encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSemanticToken {
    pub line: u32,
    pub col: u32,
    pub length: u32,
    pub token_type: u32,
    pub modifiers: u32,
}

/// Collects raw tuples and delta-encodes them for the LSP wire format.
#[derive(Debug, Default)]
pub struct SemanticTokensBuilder {
    raw: Vec<RawSemanticToken>,
}

impl SemanticTokensBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raw(&self) -> &[RawSemanticToken] {
        &self.raw
    }

    pub fn build(mut self) -> Vec<SemanticToken> {
        self.raw
            .sort_by(|a, b| a.line.cmp(&b.line).then(a.col.cmp(&b.col)));
        delta_encode(&self.raw)
    }
}

impl SemanticTokenSink for SemanticTokensBuilder {
    fn push(&mut self, line: u32, col: u32, len: u32, token_type: u32, modifiers: u32) {
        self.raw.push(RawSemanticToken {
            line,
            col,
            length: len,
            token_type,
            modifiers,
        });
    }
}

// ──────────────────────────────────────────────
// Classification
// ──────────────────────────────────────────────

/// `(type index, modifier bits)` for one token, or `None` when it carries
/// no highlighting meaning.
pub fn classify(tok: &Token) -> Option<(u32, u32)> {
    match tok.group {
        TokenGroup::Comment => Some((TK_COMMENT, 0)),
        TokenGroup::String => Some((TK_STRING, 0)),
        TokenGroup::Number => Some((TK_NUMBER, 0)),
        TokenGroup::Operator => Some((TK_OPERATOR, 0)),
        TokenGroup::Keyword => Some((TK_KEYWORD, 0)),
        TokenGroup::Marker => match tok.kind {
            TokenKind::Pragma => Some((TK_MACRO, 0)),
            TokenKind::FuncDef => Some((TK_KEYWORD, 0)),
            _ => Some((TK_OPERATOR, 0)),
        },
        TokenGroup::Identifier => classify_identifier(tok),
        TokenGroup::Punctuation | TokenGroup::Eol | TokenGroup::Invalid | TokenGroup::Eof => None,
    }
}

fn classify_identifier(tok: &Token) -> Option<(u32, u32)> {
    if tok.fix == TokenKind::Sore {
        return Some((TK_VARIABLE, MOD_DEFAULT_LIBRARY));
    }
    let mut modifiers = 0;
    match &tok.role {
        TokenRole::Reference { decl, access } => {
            if *access == Access::Declare {
                modifiers |= MOD_DECLARATION;
                if tok.parse == ParseKind::Func {
                    modifiers |= MOD_DEFINITION;
                }
            }
            if decl.table == TableRef::Catalog {
                modifiers |= MOD_DEFAULT_LIBRARY;
            }
        }
        TokenRole::Call { decl, .. } => {
            if decl.table == TableRef::Catalog {
                modifiers |= MOD_DEFAULT_LIBRARY;
            }
        }
        _ => {}
    }
    let token_type = match tok.parse {
        ParseKind::Func => TK_FUNCTION,
        ParseKind::Var => TK_VARIABLE,
        ParseKind::Const => {
            modifiers |= MOD_READONLY;
            TK_VARIABLE
        }
        ParseKind::Param => TK_PARAMETER,
        ParseKind::None => return None,
    };
    Some((token_type, modifiers))
}

/// Emit every classified token of `tokens` into `sink`, with columns and
/// lengths in the encoding of `index`. Tokens spanning several lines are
/// split into one tuple per line.
pub fn emit(tokens: &[Token], index: &LineIndex, sink: &mut dyn SemanticTokenSink) {
    for tok in tokens {
        let Some((token_type, modifiers)) = classify(tok) else {
            continue;
        };
        if !tok.span.is_multiline() {
            if tok.len > 0 {
                let Pos { line, col } = tok.span.start;
                let len = index.width(line, col, tok.len);
                sink.push(line, index.column(line, col), len, token_type, modifiers);
            }
            continue;
        }
        for (k, segment) in tok.text.split('\n').enumerate() {
            let len = segment.trim_end_matches('\r').chars().count() as u32;
            if len == 0 {
                continue;
            }
            let line = tok.span.start.line + k as u32;
            let col = if k == 0 { tok.span.start.col } else { 0 };
            sink.push(line, index.column(line, col), index.width(line, col, len), token_type, modifiers);
        }
    }
}

/// Delta-encode raw tokens into LSP SemanticToken format.
pub fn delta_encode(raw: &[RawSemanticToken]) -> Vec<SemanticToken> {
    let mut result = Vec::with_capacity(raw.len());
    let mut prev_line: u32 = 0;
    let mut prev_col: u32 = 0;

    for tok in raw {
        let delta_line = tok.line - prev_line;
        let delta_start = if delta_line == 0 {
            tok.col - prev_col
        } else {
            tok.col
        };

        result.push(SemanticToken {
            delta_line,
            delta_start,
            length: tok.length,
            token_type: tok.token_type,
            token_modifiers_bitset: tok.modifiers,
        });

        prev_line = tok.line;
        prev_col = tok.col;
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::PositionEncoding;
    use nako_core::plugin::system_catalog;
    use nako_core::{analyze, AnalyzerConfig, NoImports};

    fn tuples(src: &str) -> Vec<RawSemanticToken> {
        let a = analyze(src, "t.nako3", &NoImports, &system_catalog(), &AnalyzerConfig::default());
        let mut builder = SemanticTokensBuilder::new();
        emit(&a.tokens, &LineIndex::new(src, PositionEncoding::Utf16), &mut builder);
        builder.raw().to_vec()
    }

    #[test]
    fn legend_indices_match_constants() {
        assert_eq!(TOKEN_TYPES[TK_FUNCTION as usize], SemanticTokenType::FUNCTION);
        assert_eq!(TOKEN_TYPES[TK_MACRO as usize], SemanticTokenType::MACRO);
        assert_eq!(TOKEN_MODIFIERS.len(), 4);
    }

    #[test]
    fn catalog_call_is_default_library_function() {
        let t = tuples("「こんにちは」を表示");
        assert_eq!(t.len(), 2);
        assert_eq!((t[0].token_type, t[0].length), (TK_STRING, 7));
        assert_eq!(t[1].token_type, TK_FUNCTION);
        assert_eq!(t[1].modifiers, MOD_DEFAULT_LIBRARY);
        assert_eq!((t[1].col, t[1].length), (8, 2));
    }

    #[test]
    fn columns_are_utf16_after_astral_character() {
        let t = tuples("「\u{20B9F}」を表示");
        assert_eq!((t[0].token_type, t[0].col, t[0].length), (TK_STRING, 0, 4));
        assert_eq!((t[1].token_type, t[1].col, t[1].length), (TK_FUNCTION, 5, 2));
    }

    #[test]
    fn declarations_are_marked() {
        let t = tuples("●(Aを)倍とは\nここまで\n定数Xは1\n");
        let func = t.iter().find(|r| r.token_type == TK_FUNCTION).unwrap();
        assert_eq!(func.modifiers, MOD_DECLARATION | MOD_DEFINITION);
        let param = t.iter().find(|r| r.token_type == TK_PARAMETER).unwrap();
        assert_eq!(param.modifiers & MOD_DECLARATION, MOD_DECLARATION);
        let constant = t.iter().find(|r| r.modifiers & MOD_READONLY != 0).unwrap();
        assert_eq!(constant.token_type, TK_VARIABLE);
    }

    #[test]
    fn multiline_comment_is_split_per_line() {
        let t = tuples("/* 一行目\n二行目 */\n");
        let comments: Vec<_> = t.iter().filter(|r| r.token_type == TK_COMMENT).collect();
        assert_eq!(comments.len(), 2);
        assert_eq!((comments[0].line, comments[0].col), (0, 0));
        assert_eq!((comments[1].line, comments[1].col), (1, 0));
    }

    #[test]
    fn output_is_ascending() {
        let t = tuples("もしAが1ならば\n  「x」を表示\n違えば\n  「y」を表示\nここまで\n");
        for pair in t.windows(2) {
            assert!((pair[0].line, pair[0].col) < (pair[1].line, pair[1].col));
        }
    }

    #[test]
    fn delta_encoding_is_relative() {
        let raw = [
            RawSemanticToken { line: 0, col: 2, length: 3, token_type: 0, modifiers: 0 },
            RawSemanticToken { line: 0, col: 7, length: 1, token_type: 1, modifiers: 0 },
            RawSemanticToken { line: 2, col: 4, length: 2, token_type: 2, modifiers: 1 },
        ];
        let encoded = delta_encode(&raw);
        assert_eq!((encoded[0].delta_line, encoded[0].delta_start), (0, 2));
        assert_eq!((encoded[1].delta_line, encoded[1].delta_start), (0, 5));
        assert_eq!((encoded[2].delta_line, encoded[2].delta_start), (2, 4));
        assert_eq!(encoded[2].token_modifiers_bitset, 1);
    }
}
