//! Diagnostics produced by the analysis passes, and the bounded collector
//! that gathers them.
//!
//! Engine conditions are never `Err`: every lexical, structural, declarative
//! or resolution problem becomes an [`ErrorInfo`] and analysis continues.
//! [`NakoError`] is reserved for infrastructure failures (I/O, malformed
//! catalog JSON, cancelled loads).

use crate::token::Span;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ErrorLevel {
    Error,
    Warn,
    Info,
    Hint,
}

impl fmt::Display for ErrorLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorLevel::Error => "ERROR",
            ErrorLevel::Warn => "WARN",
            ErrorLevel::Info => "INFO",
            ErrorLevel::Hint => "HINT",
        };
        f.write_str(s)
    }
}

/// Stable identifier of a diagnostic message. Serialized in camelCase, which
/// is also the form editors use for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MessageId {
    // lexical
    InvalidChar,
    UnclosedString,
    UnclosedBlockComment,
    UnclosedPlaceHolder,
    StringInStringStartChar,
    // structural
    NoCloseStatement,
    MustThenFollowIf,
    KokomadeUseInIndentMode,
    InvalidTokenNaraba,
    InvalidTokenChigaeba,
    InvalidTokenErrorNaraba,
    // declarative
    DeclareFuncMustGlobal,
    AlreadyDeclared,
    AssignToConst,
    // resolution
    JosiNotMatched,
}

impl MessageId {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageId::InvalidChar => "invalidChar",
            MessageId::UnclosedString => "unclosedString",
            MessageId::UnclosedBlockComment => "unclosedBlockComment",
            MessageId::UnclosedPlaceHolder => "unclosedPlaceHolder",
            MessageId::StringInStringStartChar => "stringInStringStartChar",
            MessageId::NoCloseStatement => "noCloseStatement",
            MessageId::MustThenFollowIf => "mustThenFollowIf",
            MessageId::KokomadeUseInIndentMode => "kokomadeUseInIndentMode",
            MessageId::InvalidTokenNaraba => "invalidTokenNaraba",
            MessageId::InvalidTokenChigaeba => "invalidTokenChigaeba",
            MessageId::InvalidTokenErrorNaraba => "invalidTokenErrorNaraba",
            MessageId::DeclareFuncMustGlobal => "declareFuncMustGlobal",
            MessageId::AlreadyDeclared => "alreadyDeclared",
            MessageId::AssignToConst => "assignToConst",
            MessageId::JosiNotMatched => "josiNotMatched",
        }
    }

    /// Message template. `{name}` placeholders are filled from the
    /// diagnostic's args; unknown placeholders are left as written.
    pub fn template(self) -> &'static str {
        match self {
            MessageId::InvalidChar => "不正な文字「{char}」があります。",
            MessageId::UnclosedString => "文字列が「{close}」で閉じられていません。",
            MessageId::UnclosedBlockComment => "複数行コメントが閉じられていません。",
            MessageId::UnclosedPlaceHolder => "文字列中の展開「{」が「}」で閉じられていません。",
            MessageId::StringInStringStartChar => {
                "文字列の中に開始記号「{char}」があります。閉じ忘れていませんか。"
            }
            MessageId::NoCloseStatement => "『{statement}』が『ここまで』で閉じられていません。",
            MessageId::MustThenFollowIf => "『もし』の条件の後に『ならば』がありません。",
            MessageId::KokomadeUseInIndentMode => {
                "インデント構文では『ここまで』は使えません。"
            }
            MessageId::InvalidTokenNaraba => {
                "『ならば』の位置が不正です。(ネスト{nestLevel}:『{statement}』の中)"
            }
            MessageId::InvalidTokenChigaeba => {
                "『違えば』の位置が不正です。(ネスト{nestLevel}:『{statement}』の中)"
            }
            MessageId::InvalidTokenErrorNaraba => {
                "『エラーならば』の位置が不正です。(ネスト{nestLevel}:『{statement}』の中)"
            }
            MessageId::DeclareFuncMustGlobal => {
                "関数『{name}』の宣言はブロックの外(グローバル)に書く必要があります。"
            }
            MessageId::AlreadyDeclared => "『{name}』は既に{line}行目で宣言されています。",
            MessageId::AssignToConst => "定数『{name}』には代入できません。",
            MessageId::JosiNotMatched => {
                "助詞『{josi}』は関数『{func}』の引数のどれにも一致しません。"
            }
        }
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named substitution values of a diagnostic.
pub type ErrorArgs = BTreeMap<String, String>;

/// Build [`ErrorArgs`] from `(name, value)` pairs.
pub fn error_args<const N: usize>(pairs: [(&str, String); N]) -> ErrorArgs {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v))
        .collect()
}

/// One diagnostic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub level: ErrorLevel,
    pub message_id: MessageId,
    pub args: ErrorArgs,
    pub span: Span,
}

impl ErrorInfo {
    /// Render the message template with this diagnostic's args.
    pub fn message(&self) -> String {
        let mut out = self.message_id.template().to_owned();
        for (name, value) in &self.args {
            out = out.replace(&format!("{{{}}}", name), value);
        }
        out
    }
}

// ──────────────────────────────────────────────
// ErrorInfoManager
// ──────────────────────────────────────────────

/// Bounded diagnostic collector. Entries past `limit` are dropped, not
/// queued, and no entry is ever removed individually.
#[derive(Debug, Clone)]
pub struct ErrorInfoManager {
    limit: usize,
    entries: Vec<ErrorInfo>,
    dropped: usize,
}

impl Default for ErrorInfoManager {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_PROBLEMS_LIMIT)
    }
}

impl ErrorInfoManager {
    pub fn new(limit: usize) -> Self {
        ErrorInfoManager {
            limit,
            entries: Vec::new(),
            dropped: 0,
        }
    }

    /// Append a diagnostic unless the limit has been reached.
    pub fn add(&mut self, level: ErrorLevel, message_id: MessageId, args: ErrorArgs, span: Span) {
        if self.entries.len() >= self.limit {
            self.dropped += 1;
            return;
        }
        self.entries.push(ErrorInfo {
            level,
            message_id,
            args,
            span,
        });
    }

    pub fn error(&mut self, message_id: MessageId, args: ErrorArgs, span: Span) {
        self.add(ErrorLevel::Error, message_id, args, span);
    }

    pub fn warn(&mut self, message_id: MessageId, args: ErrorArgs, span: Span) {
        self.add(ErrorLevel::Warn, message_id, args, span);
    }

    pub fn hint(&mut self, message_id: MessageId, args: ErrorArgs, span: Span) {
        self.add(ErrorLevel::Hint, message_id, args, span);
    }

    /// Reset between analysis passes.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.dropped = 0;
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn all(&self) -> &[ErrorInfo] {
        &self.entries
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Number of diagnostics discarded because the limit was reached.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn into_vec(self) -> Vec<ErrorInfo> {
        self.entries
    }
}

// ──────────────────────────────────────────────
// Infrastructure errors
// ──────────────────────────────────────────────

/// Failures outside the analysis passes themselves.
#[derive(Debug, thiserror::Error)]
pub enum NakoError {
    #[error("cannot read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot fetch '{uri}': {message}")]
    Fetch { uri: String, message: String },

    #[error("invalid declaration catalog: {0}")]
    Catalog(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("load of '{uri}' was cancelled")]
    Cancelled { uri: String },
}
