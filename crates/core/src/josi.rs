//! Grammatical particles ("josi") that attach to the end of a value.

/// Particles that attach to the preceding token.
pub const JOSI_LIST: &[&str] = &[
    "について", "くらい", "なのか", "までを", "までの", "による", "とは", "から", "まで", "だけ",
    "より", "ほど", "など", "いて", "えて", "きて", "けて", "して", "って", "にて", "みて",
    "めて", "ねて", "では", "には", "んで", "は", "を", "に", "へ", "で", "と", "が", "の", "も",
];

/// Conditional particles. These are emitted as their own `Then` marker token
/// rather than attached to the value before them.
pub const TARAREBA_JOSI: &[&str] = &["でなければ", "なければ", "ならば", "なら", "たら", "れば"];

/// Surface particles that are canonicalized to another one.
pub const JOSI_ALIASES: &[(&str, &str)] = &[("も", "と")];

/// A particle found in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JosiMatch {
    /// Number of characters matched.
    pub len: usize,
    /// Surface form as written.
    pub text: &'static str,
    /// Canonical form after alias mapping.
    pub canonical: &'static str,
    pub tarareba: bool,
}

/// Longest particle starting at `pos`, if any.
pub fn match_at(chars: &[char], pos: usize) -> Option<JosiMatch> {
    let mut best: Option<JosiMatch> = None;
    let lists = [(JOSI_LIST, false), (TARAREBA_JOSI, true)];
    for (list, tarareba) in lists {
        for &josi in list {
            let len = josi.chars().count();
            if best.as_ref().is_some_and(|b| b.len >= len) {
                continue;
            }
            if starts_with_at(chars, pos, josi) {
                best = Some(JosiMatch {
                    len,
                    text: josi,
                    canonical: canonical(josi),
                    tarareba,
                });
            }
        }
    }
    best
}

/// Canonical form of a particle.
pub fn canonical(josi: &'static str) -> &'static str {
    JOSI_ALIASES
        .iter()
        .find(|(from, _)| *from == josi)
        .map(|(_, to)| *to)
        .unwrap_or(josi)
}

pub(crate) fn starts_with_at(chars: &[char], pos: usize, needle: &str) -> bool {
    let mut i = pos;
    for nc in needle.chars() {
        match chars.get(i) {
            Some(&c) if c == nc => i += 1,
            _ => return false,
        }
    }
    true
}
