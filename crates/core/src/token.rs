//! Token data model shared by every pass.

use crate::declare::DeclRef;
use crate::link::BlockId;
use serde::{Deserialize, Serialize};
use std::fmt;

// ──────────────────────────────────────────────
// Positions
// ──────────────────────────────────────────────

/// A 0-based line/column position; columns count Unicode scalar values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Pos {
    pub line: u32,
    pub col: u32,
}

impl Pos {
    pub fn new(line: u32, col: u32) -> Self {
        Pos { line, col }
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.col + 1)
    }
}

/// Half-open source range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: Pos,
    pub end: Pos,
}

impl Span {
    pub fn new(start: Pos, end: Pos) -> Self {
        Span { start, end }
    }

    pub fn is_multiline(&self) -> bool {
        self.end.line > self.start.line
    }
}

/// Leading whitespace of a physical line.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Indent {
    pub text: String,
    /// Half-width space = 1, full-width space = 2, tab snaps to the next
    /// multiple of 8.
    pub level: u32,
    /// Number of characters in `text`.
    pub len: u32,
}

impl Indent {
    pub fn measure(text: &str) -> Indent {
        let mut level = 0u32;
        for c in text.chars() {
            match c {
                ' ' => level += 1,
                '\u{3000}' => level += 2,
                '\t' => level = (level / 8 + 1) * 8,
                _ => {}
            }
        }
        Indent {
            text: text.to_owned(),
            level,
            len: text.chars().count() as u32,
        }
    }
}

// ──────────────────────────────────────────────
// Kinds
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    Word,
    Number,
    BigInt,
    /// Plain string, no injection.
    String,
    /// Template string without injections.
    Template,
    /// Literal segment of a template string that has injections.
    StringPart,
    InjectStart,
    InjectEnd,
    LineComment,
    BlockComment,
    Eol,
    Eof,
    /// `!` at the start of a line.
    Pragma,
    Invalid,
    /// `●` function definition marker.
    FuncDef,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Dot,
    Eq,
    EqEq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    Amp,
    And,
    Or,
    Not,
    Pipe,
    // Reserved words (appear as `fix` of a `Word`, or as the kind of a
    // tarareba marker).
    If,
    Then,
    Else,
    Repeat,
    While,
    For,
    Foreach,
    RepeatUntil,
    ErrorWatch,
    ErrorNaraba,
    PerfMonitor,
    SpeedPriority,
    End,
    Break,
    Continue,
    Return,
    Var,
    Const,
    Sore,
    Import,
    IndentDirective,
}

impl TokenKind {
    /// Comments never take part in grammar-level passes.
    pub fn is_trivia(self) -> bool {
        matches!(self, TokenKind::LineComment | TokenKind::BlockComment)
    }

    pub fn is_reserved(self) -> bool {
        matches!(
            self,
            TokenKind::If
                | TokenKind::Then
                | TokenKind::Else
                | TokenKind::Repeat
                | TokenKind::While
                | TokenKind::For
                | TokenKind::Foreach
                | TokenKind::RepeatUntil
                | TokenKind::ErrorWatch
                | TokenKind::ErrorNaraba
                | TokenKind::PerfMonitor
                | TokenKind::SpeedPriority
                | TokenKind::End
                | TokenKind::Break
                | TokenKind::Continue
                | TokenKind::Return
                | TokenKind::Var
                | TokenKind::Const
                | TokenKind::Sore
                | TokenKind::Import
                | TokenKind::IndentDirective
        )
    }

    /// Reserved words that may carry a particle (`それを`).
    pub fn takes_josi(self) -> bool {
        matches!(self, TokenKind::Sore | TokenKind::Word)
    }

    /// Tokens that stand for a value and therefore may carry a particle.
    pub fn is_value(self) -> bool {
        matches!(
            self,
            TokenKind::Word
                | TokenKind::Number
                | TokenKind::BigInt
                | TokenKind::String
                | TokenKind::Template
                | TokenKind::StringPart
                | TokenKind::RParen
                | TokenKind::RBracket
                | TokenKind::Sore
        )
    }

    pub fn group(self) -> TokenGroup {
        match self {
            TokenKind::Word => TokenGroup::Identifier,
            TokenKind::Number | TokenKind::BigInt => TokenGroup::Number,
            TokenKind::String | TokenKind::Template | TokenKind::StringPart => TokenGroup::String,
            TokenKind::InjectStart | TokenKind::InjectEnd => TokenGroup::Marker,
            TokenKind::LineComment | TokenKind::BlockComment => TokenGroup::Comment,
            TokenKind::Eol => TokenGroup::Eol,
            TokenKind::Eof => TokenGroup::Eof,
            TokenKind::Pragma | TokenKind::FuncDef => TokenGroup::Marker,
            TokenKind::Invalid => TokenGroup::Invalid,
            TokenKind::LParen
            | TokenKind::RParen
            | TokenKind::LBracket
            | TokenKind::RBracket
            | TokenKind::LBrace
            | TokenKind::RBrace
            | TokenKind::Comma
            | TokenKind::Colon
            | TokenKind::Dot
            | TokenKind::Pipe => TokenGroup::Punctuation,
            TokenKind::Eq
            | TokenKind::EqEq
            | TokenKind::NotEq
            | TokenKind::Lt
            | TokenKind::Gt
            | TokenKind::LtEq
            | TokenKind::GtEq
            | TokenKind::Plus
            | TokenKind::Minus
            | TokenKind::Star
            | TokenKind::Slash
            | TokenKind::Percent
            | TokenKind::Caret
            | TokenKind::Amp
            | TokenKind::And
            | TokenKind::Or
            | TokenKind::Not => TokenGroup::Operator,
            TokenKind::Sore => TokenGroup::Identifier,
            _ => TokenGroup::Keyword,
        }
    }
}

/// Coarse category used by highlighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenGroup {
    Keyword,
    Identifier,
    Number,
    String,
    Comment,
    Operator,
    Punctuation,
    Marker,
    Eol,
    Invalid,
    Eof,
}

/// Declaration class a word was resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ParseKind {
    #[default]
    None,
    Func,
    Var,
    Const,
    Param,
}

/// How a resolved reference uses its declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Access {
    Read,
    Write,
    /// The declaration site itself (also a write).
    Declare,
    /// A function named as a value rather than called.
    Pointer,
}

/// Binding of one call-site value token to a declared argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgBinding {
    /// Index of the value token.
    pub token: usize,
    /// Index into the function's argument list; `None` if the particle
    /// matched no declared argument.
    pub arg: Option<usize>,
}

/// What a token became after linking and resolution.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub enum TokenRole {
    #[default]
    Plain,
    /// Opener of a block.
    LinkMain(BlockId),
    /// Clause or terminator of the block opened at token `main`.
    LinkRef { main: usize },
    Reference { decl: DeclRef, access: Access },
    Call { decl: DeclRef, args: Vec<ArgBinding> },
}

/// A particle or unit suffix attached to a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub text: String,
    /// Canonical form (particle aliases resolved, full-width folded).
    pub value: String,
    pub start: Pos,
}

// ──────────────────────────────────────────────
// Token
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    /// Raw lexical kind.
    pub kind: TokenKind,
    /// Grammar-level kind; differs from `kind` for reserved words.
    pub fix: TokenKind,
    pub parse: ParseKind,
    pub group: TokenGroup,
    /// Raw text, without unit or particle.
    pub text: String,
    /// Normalized text: full-width folded, okurigana trimmed for words.
    pub value: String,
    /// Covers text, unit and particle.
    pub span: Span,
    /// Length of `text` in characters.
    pub len: u32,
    pub unit: Option<Attachment>,
    pub josi: Option<Attachment>,
    /// Set on the first token of each physical line.
    pub indent: Option<Indent>,
    /// Innermost block whose body contains this token.
    pub block: Option<BlockId>,
    pub role: TokenRole,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, value: impl Into<String>, span: Span) -> Self {
        let text = text.into();
        Token {
            kind,
            fix: kind,
            parse: ParseKind::None,
            group: kind.group(),
            len: text.chars().count() as u32,
            text,
            value: value.into(),
            span,
            unit: None,
            josi: None,
            indent: None,
            block: None,
            role: TokenRole::Plain,
        }
    }

    /// Canonical particle, if any.
    pub fn josi(&self) -> Option<&str> {
        self.josi.as_ref().map(|j| j.value.as_str())
    }

    pub fn is_trivia(&self) -> bool {
        self.kind.is_trivia()
    }

    /// Newline or `。`.
    pub fn is_eol(&self) -> bool {
        matches!(self.kind, TokenKind::Eol | TokenKind::Eof)
    }

    /// Newline (not `。`) or end of file.
    pub fn is_line_break(&self) -> bool {
        self.kind == TokenKind::Eof || (self.kind == TokenKind::Eol && self.text == "\n")
    }

    pub fn decl(&self) -> Option<&DeclRef> {
        match &self.role {
            TokenRole::Reference { decl, .. } | TokenRole::Call { decl, .. } => Some(decl),
            _ => None,
        }
    }
}
