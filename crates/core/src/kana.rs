//! Character classes and normalization for Japanese source text.

pub fn is_hiragana(c: char) -> bool {
    matches!(c, '\u{3041}'..='\u{3096}' | '\u{309D}' | '\u{309E}')
}

pub fn is_katakana(c: char) -> bool {
    matches!(c, '\u{30A1}'..='\u{30FA}' | '\u{30FC}'..='\u{30FE}' | '\u{FF66}'..='\u{FF9F}')
}

pub fn is_kanji(c: char) -> bool {
    matches!(
        c,
        '\u{4E00}'..='\u{9FFF}' | '\u{3400}'..='\u{4DBF}' | '\u{F900}'..='\u{FAFF}' | '々' | '〆'
    )
}

/// Half-width or full-width decimal digit.
pub fn is_digit(c: char) -> bool {
    c.is_ascii_digit() || ('０'..='９').contains(&c)
}

pub fn is_word_start(c: char) -> bool {
    is_kanji(c)
        || is_katakana(c)
        || is_hiragana(c)
        || c == '_'
        || c == '＿'
        || (c.is_alphabetic() && !is_digit(c))
}

pub fn is_word_char(c: char) -> bool {
    is_word_start(c) || is_digit(c)
}

/// Whitespace that separates tokens on a line (newline excluded).
pub fn is_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\u{3000}' | '\r')
}

/// Map a full-width ASCII variant (and the ideographic space) to its
/// half-width form; every other character is returned unchanged.
pub fn to_half_width(c: char) -> char {
    match c {
        '\u{FF01}'..='\u{FF5E}' => char::from_u32(c as u32 - 0xFEE0).unwrap_or(c),
        '\u{3000}' => ' ',
        _ => c,
    }
}

pub fn normalize(s: &str) -> String {
    s.chars().map(to_half_width).collect()
}

/// Strip okurigana to get the canonical key of a word.
///
/// An all-hiragana word is returned unchanged; otherwise only the trailing
/// run of hiragana is removed (`置換する` → `置換`, `お願いします` → `お願`).
pub fn trim_okurigana(word: &str) -> String {
    if word.chars().all(is_hiragana) {
        return word.to_owned();
    }
    let trimmed = word.trim_end_matches(is_hiragana);
    if trimmed.is_empty() {
        word.to_owned()
    } else {
        trimmed.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn okurigana_all_hiragana_is_untouched() {
        assert_eq!(trim_okurigana("どうぞ"), "どうぞ");
        assert_eq!(trim_okurigana("あいう"), "あいう");
    }

    #[test]
    fn okurigana_strips_only_trailing_run() {
        assert_eq!(trim_okurigana("置換する"), "置換");
        assert_eq!(trim_okurigana("表示"), "表示");
        assert_eq!(trim_okurigana("繰り返す"), "繰り返");
        assert_eq!(trim_okurigana("お願いします"), "お願");
    }

    #[test]
    fn full_width_is_normalized() {
        assert_eq!(normalize("ＡＢＣ１２３"), "ABC123");
        assert_eq!(to_half_width('＝'), '=');
        assert_eq!(to_half_width('\u{3000}'), ' ');
        assert_eq!(to_half_width('あ'), 'あ');
    }

    #[test]
    fn classes() {
        assert!(is_hiragana('を'));
        assert!(is_katakana('ー'));
        assert!(is_kanji('々'));
        assert!(is_word_start('Ａ'));
        assert!(!is_word_start('１'));
        assert!(is_word_char('１'));
    }
}
