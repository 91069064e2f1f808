//! Reserved word table: normalized surface text to grammar-level kind.

use crate::josi;
use crate::kana::{is_hiragana, is_kanji, is_katakana};
use crate::token::TokenKind;

/// Every surface form, synonyms included.
static RESERVED: &[(&str, TokenKind)] = &[
    ("もし", TokenKind::If),
    ("ならば", TokenKind::Then),
    ("なら", TokenKind::Then),
    ("でなければ", TokenKind::Then),
    ("違えば", TokenKind::Else),
    ("回", TokenKind::Repeat),
    ("間", TokenKind::While),
    ("繰り返す", TokenKind::For),
    ("繰り返", TokenKind::For),
    ("繰返す", TokenKind::For),
    ("繰返", TokenKind::For),
    ("増繰り返す", TokenKind::For),
    ("増繰返", TokenKind::For),
    ("減繰り返す", TokenKind::For),
    ("減繰返", TokenKind::For),
    ("反復", TokenKind::Foreach),
    ("後判定", TokenKind::RepeatUntil),
    ("エラー監視", TokenKind::ErrorWatch),
    ("エラーならば", TokenKind::ErrorNaraba),
    ("エラー", TokenKind::ErrorNaraba),
    ("パフォーマンスモニタ適用", TokenKind::PerfMonitor),
    ("実行速度優先", TokenKind::SpeedPriority),
    ("速度優先", TokenKind::SpeedPriority),
    ("ここまでだ", TokenKind::End),
    ("ここまで", TokenKind::End),
    ("抜ける", TokenKind::Break),
    ("続ける", TokenKind::Continue),
    ("戻る", TokenKind::Return),
    ("変数", TokenKind::Var),
    ("定数", TokenKind::Const),
    ("それ", TokenKind::Sore),
    ("取り込む", TokenKind::Import),
    ("取込", TokenKind::Import),
    ("インデント構文", TokenKind::IndentDirective),
];

/// Exact lookup of a (normalized) word.
pub fn lookup(word: &str) -> Option<TokenKind> {
    RESERVED.iter().find(|(w, _)| *w == word).map(|(_, k)| *k)
}

/// Longest reserved word starting at `pos`, without a boundary check.
pub fn longest_prefix(chars: &[char], pos: usize) -> Option<(usize, TokenKind)> {
    let mut best: Option<(usize, TokenKind)> = None;
    for &(word, kind) in RESERVED {
        let len = word.chars().count();
        if best.is_some_and(|(n, _)| n >= len) {
            continue;
        }
        if josi::starts_with_at(chars, pos, word) {
            best = Some((len, kind));
        }
    }
    best
}

/// Longest reserved word at `pos` that also ends on a word boundary, so
/// `回数` or `間違い` stay ordinary words.
pub fn match_at(chars: &[char], pos: usize) -> Option<(usize, TokenKind)> {
    let (len, kind) = longest_prefix(chars, pos)?;
    let end = pos + len;
    let boundary = match chars.get(end) {
        None => true,
        Some(&c) if is_kanji(c) || is_katakana(c) => false,
        Some(&c) if is_hiragana(c) => {
            longest_prefix(chars, end).is_some()
                || (kind.takes_josi() && josi::match_at(chars, end).is_some())
        }
        Some(_) => true,
    };
    boundary.then_some((len, kind))
}
