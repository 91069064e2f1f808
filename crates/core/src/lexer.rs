//! Lexer: source text to an ordered token stream.
//!
//! Never fails. Malformed input produces a diagnostic and the scan carries
//! on, so the stream always ends with an `Eof` token.

use crate::error::{error_args, ErrorInfoManager, MessageId};
use crate::josi;
use crate::kana::{
    is_digit, is_hiragana, is_kanji, is_katakana, is_space, is_word_char, is_word_start,
    normalize, to_half_width, trim_okurigana,
};
use crate::reserved;
use crate::token::{Attachment, Indent, Pos, Span, Token, TokenKind};

/// Numeric unit suffixes, compared after full-width folding.
static UNITS: &[&str] = &[
    "円", "ドル", "元", "歩", "㎡", "坪", "度", "℃", "°", "個", "つ", "本", "冊", "才", "歳", "匹",
    "枚", "皿", "セット", "羽", "人", "件", "行", "列", "機", "品", "mm", "cm", "km", "kg", "px",
    "dot", "pt", "em", "mb", "kb", "gb", "m", "g", "t", "b",
];

/// Two-character operators, compared after full-width folding.
static OPERATORS2: &[(&str, TokenKind)] = &[
    ("==", TokenKind::EqEq),
    ("!=", TokenKind::NotEq),
    ("<>", TokenKind::NotEq),
    ("<=", TokenKind::LtEq),
    (">=", TokenKind::GtEq),
    ("&&", TokenKind::And),
    ("||", TokenKind::Or),
];

/// Tokenize `src`. `source` names the unit being lexed in trace output.
pub fn lex(src: &str, source: &str, errors: &mut ErrorInfoManager) -> Vec<Token> {
    let mut lexer = Lexer::new(src, errors);
    lexer.scan(Mode::Top);
    let eof = lexer.here();
    lexer.push(Token::new(TokenKind::Eof, "", "", Span::new(eof, eof)));
    tracing::debug!(source, tokens = lexer.tokens.len(), "lexed");
    lexer.tokens
}

#[derive(Clone, Copy)]
enum Mode {
    Top,
    /// Inside `{…}` of a template string closed by `close`.
    Inject { close: &'static str },
}

enum Scan {
    Eof,
    InjectClosed,
    InjectBroken,
}

struct Lexer<'a> {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    col: u32,
    at_line_start: bool,
    line_has_token: bool,
    pending_indent: Option<Indent>,
    tokens: Vec<Token>,
    errors: &'a mut ErrorInfoManager,
}

impl<'a> Lexer<'a> {
    fn new(src: &str, errors: &'a mut ErrorInfoManager) -> Self {
        Lexer {
            chars: src.chars().collect(),
            pos: 0,
            line: 0,
            col: 0,
            at_line_start: true,
            line_has_token: false,
            pending_indent: None,
            tokens: Vec::new(),
            errors,
        }
    }

    // ── Cursor ───────────────────────────────────────────────────────

    fn here(&self) -> Pos {
        Pos::new(self.line, self.col)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> char {
        let c = self.chars[self.pos];
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.col = 0;
        } else {
            self.col += 1;
        }
        c
    }

    fn take(&mut self, n: usize) -> String {
        let mut s = String::new();
        for _ in 0..n {
            if self.pos >= self.chars.len() {
                break;
            }
            s.push(self.bump());
        }
        s
    }

    /// Literal match at the cursor.
    fn at(&self, needle: &str) -> bool {
        josi::starts_with_at(&self.chars, self.pos, needle)
    }

    /// Match at the cursor after folding full-width characters.
    fn at_folded(&self, needle: &str) -> bool {
        needle
            .chars()
            .enumerate()
            .all(|(i, nc)| self.peek_at(i).map(to_half_width) == Some(nc))
    }

    // ── Emission ─────────────────────────────────────────────────────

    fn push(&mut self, mut tok: Token) {
        if let Some(indent) = self.pending_indent.take() {
            tok.indent = Some(indent);
        }
        if tok.kind != TokenKind::Eol {
            self.line_has_token = true;
        }
        self.tokens.push(tok);
    }

    fn push_simple(&mut self, kind: TokenKind, text: &str, value: &str, start: Pos) {
        let span = Span::new(start, self.here());
        self.push(Token::new(kind, text, value, span));
    }

    /// Push a value token, consuming a trailing particle when allowed.
    /// Conditional particles become a separate `Then` marker token.
    #[allow(clippy::too_many_arguments)]
    fn finish(
        &mut self,
        kind: TokenKind,
        fix: TokenKind,
        text: String,
        value: String,
        start: Pos,
        unit: Option<Attachment>,
        allow_josi: bool,
    ) {
        let mut attached = None;
        let mut marker = None;
        if allow_josi {
            if let Some(m) = josi::match_at(&self.chars, self.pos) {
                if m.tarareba {
                    marker = Some(m);
                } else {
                    let jstart = self.here();
                    self.take(m.len);
                    attached = Some(Attachment {
                        text: m.text.to_owned(),
                        value: m.canonical.to_owned(),
                        start: jstart,
                    });
                }
            }
        }
        let mut tok = Token::new(kind, text, value, Span::new(start, self.here()));
        tok.fix = fix;
        tok.group = fix.group();
        tok.unit = unit;
        tok.josi = attached;
        self.push(tok);

        if let Some(m) = marker {
            let mstart = self.here();
            self.take(m.len);
            let value = if m.text.ends_with("なければ") {
                "でなければ"
            } else {
                "ならば"
            };
            self.push_simple(TokenKind::Then, m.text, value, mstart);
        }
    }

    // ── Main loop ────────────────────────────────────────────────────

    fn scan(&mut self, mode: Mode) -> Scan {
        let mut brace_depth = 0usize;
        while let Some(c) = self.peek() {
            if self.at_line_start {
                self.at_line_start = false;
                let begin = self.pos;
                while matches!(self.peek(), Some(' ' | '\t' | '\u{3000}')) {
                    self.bump();
                }
                let text: String = self.chars[begin..self.pos].iter().collect();
                self.pending_indent = Some(Indent::measure(&text));
                continue;
            }
            if let Mode::Inject { close } = mode {
                if c == '\n' || self.at(close) {
                    return Scan::InjectBroken;
                }
                if matches!(c, '}' | '｝') && brace_depth == 0 {
                    return Scan::InjectClosed;
                }
            }
            match c {
                '\n' => {
                    let start = self.here();
                    self.bump();
                    self.push_simple(TokenKind::Eol, "\n", "\n", start);
                    self.at_line_start = true;
                    self.line_has_token = false;
                }
                c if is_space(c) => {
                    self.bump();
                }
                '。' => {
                    let start = self.here();
                    self.bump();
                    self.push_simple(TokenKind::Eol, "。", "。", start);
                }
                '#' | '＃' | '※' => self.lex_line_comment(),
                '/' | '／' if self.at_folded("//") => self.lex_line_comment(),
                '/' | '／' if self.at_folded("/*") => self.lex_block_comment(),
                '!' | '！' if !self.line_has_token && matches!(mode, Mode::Top) => {
                    let start = self.here();
                    let text = self.take(1);
                    self.push_simple(TokenKind::Pragma, &text, "!", start);
                }
                '「' | '『' | '"' | '\'' => self.lex_string(),
                '●' => {
                    let start = self.here();
                    self.bump();
                    self.push_simple(TokenKind::FuncDef, "●", "●", start);
                }
                c if is_digit(c) => self.lex_number(),
                c if is_word_start(c) => self.lex_word(),
                '{' | '｛' => {
                    brace_depth += 1;
                    self.lex_operator();
                }
                '}' | '｝' => {
                    brace_depth = brace_depth.saturating_sub(1);
                    self.lex_operator();
                }
                _ => self.lex_operator(),
            }
        }
        Scan::Eof
    }

    // ── Comments ─────────────────────────────────────────────────────

    fn lex_line_comment(&mut self) {
        let start = self.here();
        let begin = self.pos;
        while self.peek().is_some_and(|c| c != '\n') {
            self.bump();
        }
        let text: String = self.chars[begin..self.pos].iter().collect();
        self.push_simple(TokenKind::LineComment, &text, &text, start);
    }

    fn lex_block_comment(&mut self) {
        let start = self.here();
        let begin = self.pos;
        self.take(2);
        let mut closed = false;
        while self.peek().is_some() {
            if self.at_folded("*/") {
                self.take(2);
                closed = true;
                break;
            }
            self.bump();
        }
        if !closed {
            self.errors.error(
                MessageId::UnclosedBlockComment,
                error_args([]),
                Span::new(start, self.here()),
            );
        }
        let text: String = self.chars[begin..self.pos].iter().collect();
        self.push_simple(TokenKind::BlockComment, &text, &text, start);
    }

    // ── Strings ──────────────────────────────────────────────────────

    fn lex_string(&mut self) {
        let start = self.here();
        let doubled = self.peek_at(1) == self.peek();
        let (open, close, template): (&str, &'static str, bool) = match self.peek() {
            Some('「') if doubled => ("「「", "」」", true),
            Some('「') => ("「", "」", true),
            Some('『') if doubled => ("『『", "』』", false),
            Some('『') => ("『", "』", false),
            Some('"') => ("\"", "\"", true),
            _ => ("'", "'", false),
        };
        let mut seg_text = self.take(open.chars().count());
        let mut seg_value = String::new();
        let mut seg_start = start;
        let mut has_parts = false;
        let mut closed = false;
        let mut warned = false;

        while let Some(c) = self.peek() {
            if self.at(close) {
                seg_text.push_str(&self.take(close.chars().count()));
                closed = true;
                break;
            }
            if template && matches!(c, '{' | '｛') {
                if !seg_text.is_empty() {
                    let seg = Token::new(
                        TokenKind::StringPart,
                        std::mem::take(&mut seg_text),
                        std::mem::take(&mut seg_value),
                        Span::new(seg_start, self.here()),
                    );
                    self.push(seg);
                }
                has_parts = true;
                let inject = self.here();
                let text = self.take(1);
                self.push_simple(TokenKind::InjectStart, &text, "{", inject);
                match self.scan(Mode::Inject { close }) {
                    Scan::InjectClosed => {
                        let end = self.here();
                        let text = self.take(1);
                        self.push_simple(TokenKind::InjectEnd, &text, "}", end);
                    }
                    Scan::InjectBroken | Scan::Eof => {
                        self.errors.error(
                            MessageId::UnclosedPlaceHolder,
                            error_args([]),
                            Span::new(inject, self.here()),
                        );
                    }
                }
                seg_start = self.here();
                continue;
            }
            if open == "「" && c == '「' && !warned {
                warned = true;
                let at = self.here();
                self.errors.warn(
                    MessageId::StringInStringStartChar,
                    error_args([("char", c.to_string())]),
                    Span::new(at, Pos::new(at.line, at.col + 1)),
                );
            }
            seg_text.push(c);
            seg_value.push(c);
            self.bump();
        }

        if !closed {
            self.errors.error(
                MessageId::UnclosedString,
                error_args([("close", close.to_owned())]),
                Span::new(start, self.here()),
            );
        }
        if seg_text.is_empty() {
            return;
        }
        let kind = if has_parts {
            TokenKind::StringPart
        } else if template {
            TokenKind::Template
        } else {
            TokenKind::String
        };
        self.finish(kind, kind, seg_text, seg_value, seg_start, None, closed);
    }

    // ── Numbers ──────────────────────────────────────────────────────

    fn lex_number(&mut self) {
        let start = self.here();
        let begin = self.pos;
        let folded = |c: Option<char>| c.map(to_half_width);

        if folded(self.peek()) == Some('0')
            && matches!(folded(self.peek_at(1)), Some('x' | 'X'))
            && folded(self.peek_at(2)).is_some_and(|c| c.is_ascii_hexdigit())
        {
            self.take(2);
            while folded(self.peek()).is_some_and(|c| c.is_ascii_hexdigit() || c == '_') {
                self.bump();
            }
        } else {
            self.take_digits();
            if folded(self.peek()) == Some('.') && self.peek_at(1).is_some_and(is_digit) {
                self.bump();
                self.take_digits();
            }
            let exp_sign = matches!(folded(self.peek_at(1)), Some('+' | '-'));
            let exp_digit_at = if exp_sign { 2 } else { 1 };
            if matches!(folded(self.peek()), Some('e' | 'E'))
                && self.peek_at(exp_digit_at).is_some_and(is_digit)
            {
                self.take(exp_digit_at);
                self.take_digits();
            }
        }

        let mut kind = TokenKind::Number;
        if folded(self.peek()) == Some('n')
            && !folded(self.peek_at(1)).is_some_and(|c| c.is_ascii_alphanumeric())
        {
            self.bump();
            kind = TokenKind::BigInt;
        }

        let text: String = self.chars[begin..self.pos].iter().collect();
        let value = normalize(&text).replace('_', "");
        let unit = self.lex_unit();
        self.finish(kind, kind, text, value, start, unit, true);
    }

    fn take_digits(&mut self) {
        while let Some(c) = self.peek() {
            let separator = c == '_' && self.peek_at(1).is_some_and(is_digit);
            if !is_digit(c) && !separator {
                break;
            }
            self.bump();
        }
    }

    fn lex_unit(&mut self) -> Option<Attachment> {
        let mut best: Option<&str> = None;
        for &unit in UNITS {
            if best.is_some_and(|b| b.chars().count() >= unit.chars().count()) {
                continue;
            }
            if !self.at_folded(unit) {
                continue;
            }
            let after = self.peek_at(unit.chars().count());
            let boundary = match after {
                None => true,
                Some(c) => {
                    let c = to_half_width(c);
                    !(is_kanji(c) || is_katakana(c) || c.is_ascii_alphanumeric())
                }
            };
            if boundary {
                best = Some(unit);
            }
        }
        let unit = best?;
        let start = self.here();
        let text = self.take(unit.chars().count());
        Some(Attachment {
            text,
            value: unit.to_owned(),
            start,
        })
    }

    // ── Words ────────────────────────────────────────────────────────

    fn lex_word(&mut self) {
        let start = self.here();
        if let Some((len, kind)) = reserved::match_at(&self.chars, self.pos) {
            let text = self.take(len);
            let value = normalize(&text);
            self.finish(TokenKind::Word, kind, text, value, start, None, kind.takes_josi());
            return;
        }

        let begin = self.pos;
        let mut seen_hiragana = false;
        while let Some(c) = self.peek() {
            if !is_word_char(c) {
                break;
            }
            if is_hiragana(c) {
                if self.pos > begin && josi::match_at(&self.chars, self.pos).is_some() {
                    break;
                }
                seen_hiragana = true;
            } else if seen_hiragana {
                break;
            }
            self.bump();
        }
        let text: String = self.chars[begin..self.pos].iter().collect();
        let value = normalize(&trim_okurigana(&text));
        let fix = reserved::lookup(&value)
            .or_else(|| reserved::lookup(&text))
            .unwrap_or(TokenKind::Word);
        self.finish(TokenKind::Word, fix, text, value, start, None, fix.takes_josi());
    }

    // ── Operators ────────────────────────────────────────────────────

    fn lex_operator(&mut self) {
        let start = self.here();
        for &(op, kind) in OPERATORS2 {
            if self.at_folded(op) {
                let text = self.take(2);
                self.push_simple(kind, &text, op, start);
                return;
            }
        }
        let c = self.bump();
        let folded = to_half_width(c);
        let kind = match folded {
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            ',' | '、' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            '.' => TokenKind::Dot,
            '=' => TokenKind::Eq,
            '≠' => TokenKind::NotEq,
            '<' => TokenKind::Lt,
            '>' => TokenKind::Gt,
            '≦' => TokenKind::LtEq,
            '≧' => TokenKind::GtEq,
            '+' => TokenKind::Plus,
            '-' | '−' => TokenKind::Minus,
            '*' | '×' => TokenKind::Star,
            '/' | '÷' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '^' => TokenKind::Caret,
            '&' => TokenKind::Amp,
            '|' => TokenKind::Pipe,
            '!' => TokenKind::Not,
            _ => {
                let span = Span::new(start, self.here());
                self.errors.error(
                    MessageId::InvalidChar,
                    error_args([("char", c.to_string())]),
                    span,
                );
                self.push(Token::new(TokenKind::Invalid, c.to_string(), c.to_string(), span));
                return;
            }
        };
        let value = folded.to_string();
        if matches!(kind, TokenKind::RParen | TokenKind::RBracket) {
            self.finish(kind, kind, c.to_string(), value, start, None, true);
        } else {
            self.push_simple(kind, &c.to_string(), &value, start);
        }
    }
}
