//! End-to-end properties of the engine, driven through the public API.

use nako_core::config::DEFAULT_PROBLEMS_LIMIT;
use nako_core::kana::trim_okurigana;
use nako_core::plugin::system_catalog;
use nako_core::{
    analyze, lex, AnalyzerConfig, BlockKind, ErrorInfoManager, MessageId, NoImports, TokenKind,
    TokenRole,
};

const PROGRAM: &str = "\
# 合計を計算する
●(AとBを)合計するとは
  CはAとBを足す
  Cで戻る
ここまで

もし、3と4を合計が7ならば
  「一致」を表示
違えば
  「不一致」を表示
ここまで

Nは0
1から10まで繰り返す
  Nが5ならば抜ける
  Nを表示
ここまで

10回
  「{N}回目」を表示。Nは、Nと1を足す
ここまで

エラー監視
  1を0で割る
エラーならば
  「失敗」を表示
ここまで
";

/// The remaining block openers, each multi-line and, where the language
/// allows it, on one line.
const MORE_OPENERS: &str = "\
Lを反復
  対象を表示
ここまで

後判定
  Nは、Nと1を足す
ここまで、Nが5未満の間

後判定で繰り返す
  Nを表示
ここまで、Nが3未満の間

パフォーマンスモニタ適用
  「計測」を表示
ここまで

実行速度優先
  「高速」を表示
ここまで

Lを反復して表示
パフォーマンスモニタ適用、「x」を表示
実行速度優先、「y」を表示
";

fn structural(ids: &[MessageId]) -> Vec<MessageId> {
    ids.iter()
        .copied()
        .filter(|id| {
            matches!(
                id,
                MessageId::NoCloseStatement
                    | MessageId::MustThenFollowIf
                    | MessageId::KokomadeUseInIndentMode
                    | MessageId::InvalidTokenNaraba
                    | MessageId::InvalidTokenChigaeba
                    | MessageId::InvalidTokenErrorNaraba
            )
        })
        .collect()
}

fn run(src: &str) -> nako_core::Analysis {
    analyze(
        src,
        "main.nako3",
        &NoImports,
        &system_catalog(),
        &AnalyzerConfig::default(),
    )
}

// ──────────────────────────────────────────────
// Span ordering
// ──────────────────────────────────────────────

#[test]
fn spans_are_ordered_for_valid_and_broken_input() {
    let inputs = [
        PROGRAM,
        "",
        "\n\n",
        "「閉じない文字列",
        "/* 閉じないコメント\n表示",
        "「{式」が壊れている」と表示",
        "＠＃＄％",
        "A=1。B=2。\n\tC=A+B",
        "『『\n複数行\n』』を表示",
        "100円を3人で割る",
    ];
    for src in inputs {
        let mut errors = ErrorInfoManager::default();
        let tokens = lex(src, "t.nako3", &mut errors);
        let last = tokens.last().expect("never empty");
        assert_eq!(last.kind, TokenKind::Eof, "input {src:?}");
        for pair in tokens.windows(2) {
            assert!(pair[0].span.start < pair[1].span.start, "input {src:?}: {pair:?}");
            assert!(pair[0].span.end <= pair[1].span.start, "input {src:?}: {pair:?}");
        }
        for tok in &tokens {
            assert!(tok.span.end >= tok.span.start);
        }
    }
}

// ──────────────────────────────────────────────
// Indent arithmetic
// ──────────────────────────────────────────────

fn first_indent(src: &str) -> u32 {
    let mut errors = ErrorInfoManager::default();
    let tokens = lex(src, "t.nako3", &mut errors);
    tokens[0].indent.as_ref().expect("first token has indent").level
}

#[test]
fn indent_levels_accumulate_per_character() {
    for n in 0..6 {
        assert_eq!(first_indent(&format!("{}表示", " ".repeat(n))), n as u32);
        assert_eq!(first_indent(&format!("{}表示", "\u{3000}".repeat(n))), 2 * n as u32);
    }
    assert_eq!(first_indent(" \u{3000} 表示"), 4);
    assert_eq!(first_indent("   \t表示"), 8);
    assert_eq!(first_indent("\t\u{3000}表示"), 10);
}

// ──────────────────────────────────────────────
// Block balance
// ──────────────────────────────────────────────

#[test]
fn well_formed_program_is_balanced() {
    let a = run(PROGRAM);
    let ids: Vec<MessageId> = a.diagnostics.iter().map(|d| d.message_id).collect();
    assert!(structural(&ids).is_empty(), "{:?}", a.diagnostics);

    let multi: Vec<_> = a.blocks.blocks.iter().filter(|b| !b.single_line).collect();
    assert_eq!(multi.len(), 5);
    for block in multi {
        let closer = block.closer.expect("terminated");
        assert_eq!(a.tokens[closer].fix, TokenKind::End);
        let refs = a
            .tokens
            .iter()
            .filter(|t| t.fix == TokenKind::End)
            .filter(|t| t.role == TokenRole::LinkRef { main: block.opener })
            .count();
        assert_eq!(refs, 1);
    }
}

#[test]
fn removing_one_terminator_reports_once() {
    let positions: Vec<usize> = PROGRAM.match_indices("ここまで\n").map(|(i, _)| i).collect();
    assert_eq!(positions.len(), 5);
    for at in positions {
        let mut broken = PROGRAM.to_owned();
        broken.replace_range(at..at + "ここまで\n".len(), "");
        let a = run(&broken);
        let ids: Vec<MessageId> = a.diagnostics.iter().map(|d| d.message_id).collect();
        assert_eq!(
            structural(&ids),
            vec![MessageId::NoCloseStatement],
            "removed terminator at byte {at}"
        );
    }
}

#[test]
fn every_opener_links_cleanly() {
    let a = run(MORE_OPENERS);
    let ids: Vec<MessageId> = a.diagnostics.iter().map(|d| d.message_id).collect();
    assert!(structural(&ids).is_empty(), "{:?}", a.diagnostics);

    let count = |kind: BlockKind, single: bool| {
        a.blocks
            .blocks
            .iter()
            .filter(|b| b.kind == kind && b.single_line == single)
            .count()
    };
    assert_eq!(count(BlockKind::Foreach, false), 1);
    assert_eq!(count(BlockKind::RepeatUntil, false), 2);
    assert_eq!(count(BlockKind::PerfMonitor, false), 1);
    assert_eq!(count(BlockKind::SpeedPriority, false), 1);
    assert_eq!(count(BlockKind::Foreach, true), 1);
    assert_eq!(count(BlockKind::PerfMonitor, true), 1);
    assert_eq!(count(BlockKind::SpeedPriority, true), 1);
    // Neither the loop word nor the trailing condition opens a block.
    assert_eq!(count(BlockKind::For, true) + count(BlockKind::For, false), 0);
    assert_eq!(count(BlockKind::While, true) + count(BlockKind::While, false), 0);
}

#[test]
fn removing_a_terminator_line_from_any_opener_reports_once() {
    let mut lines: Vec<(usize, usize)> = Vec::new();
    let mut at = 0;
    for line in MORE_OPENERS.split_inclusive('\n') {
        if line.starts_with("ここまで") {
            lines.push((at, at + line.len()));
        }
        at += line.len();
    }
    assert_eq!(lines.len(), 5);
    for (start, end) in lines {
        let mut broken = MORE_OPENERS.to_owned();
        broken.replace_range(start..end, "");
        let a = run(&broken);
        let ids: Vec<MessageId> = a.diagnostics.iter().map(|d| d.message_id).collect();
        assert_eq!(
            structural(&ids),
            vec![MessageId::NoCloseStatement],
            "removed terminator line at byte {start}"
        );
    }
}

// ──────────────────────────────────────────────
// Okurigana
// ──────────────────────────────────────────────

#[test]
fn okurigana_trimming() {
    assert_eq!(trim_okurigana("ひらがな"), "ひらがな");
    assert_eq!(trim_okurigana("計算する"), "計算");
    assert_eq!(trim_okurigana("書き込む"), "書き込");
    assert_eq!(trim_okurigana("カタカナ"), "カタカナ");

    let a = run("「x」を表示します");
    let show = a.tokens.iter().find(|t| t.text == "表示します").unwrap();
    assert_eq!(show.value, "表示");
    assert!(matches!(show.role, TokenRole::Call { .. }));
}

// ──────────────────────────────────────────────
// Particle binding
// ──────────────────────────────────────────────

#[test]
fn particle_binding_is_order_independent() {
    let src = "●(AにBと|Bを)加えるとは\nここまで\n1と2に加える\n1に2と加える\n1で2に加える\n";
    let a = run(src);
    let calls: Vec<_> = a
        .tokens
        .iter()
        .filter_map(|t| match &t.role {
            TokenRole::Call { args, .. } if t.value == "加" => Some(args.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(calls.len(), 3);

    let josi_of = |idx: usize| a.tokens[idx].josi().unwrap().to_owned();
    for args in &calls[..2] {
        for b in args {
            let expected = if josi_of(b.token) == "に" { 0 } else { 1 };
            assert_eq!(b.arg, Some(expected));
        }
    }
    let third = &calls[2];
    assert_eq!(third[0].arg, None);
    assert_eq!(third[1].arg, Some(0));

    let hints = a
        .diagnostics
        .iter()
        .filter(|d| d.message_id == MessageId::JosiNotMatched)
        .count();
    assert_eq!(hints, 1);
}

#[test]
fn unmatched_particle_hint_can_be_disabled() {
    let config = AnalyzerConfig {
        hint_unmatched_josi: false,
        ..AnalyzerConfig::default()
    };
    let src = "●(Aを)処理とは\nここまで\n1で処理\n";
    let a = analyze(src, "main.nako3", &NoImports, &system_catalog(), &config);
    assert!(a.diagnostics.is_empty(), "{:?}", a.diagnostics);
}

// ──────────────────────────────────────────────
// Diagnostics cap
// ──────────────────────────────────────────────

#[test]
fn diagnostics_never_exceed_the_limit() {
    let src = "@".repeat(DEFAULT_PROBLEMS_LIMIT + 50);
    let a = run(&src);
    assert_eq!(a.diagnostics.len(), DEFAULT_PROBLEMS_LIMIT);
    assert_eq!(a.dropped, 50);

    let mut errors = ErrorInfoManager::new(3);
    lex("@@@@@@", "t.nako3", &mut errors);
    assert_eq!(errors.count(), 3);
}

// ──────────────────────────────────────────────
// Scopes
// ──────────────────────────────────────────────

#[test]
fn scopes_follow_function_definition_order() {
    let src = "●fとは\n  Xは1\nここまで\n●gとは\n  Xは2\nここまで\n";
    let a = run(src);
    let scopes = a.table.scopes.ranges();
    assert_eq!(scopes.len(), 3);
    assert_eq!(scopes[1].0 .0, 1);
    assert_eq!(scopes[2].0 .0, 2);
    assert!(scopes[1].2 <= scopes[2].1);
    assert!(a.table.scopes.is_forest());
}
