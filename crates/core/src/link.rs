//! Block linker: pairs block openers with their clauses and terminators.
//!
//! A single left-to-right scan over logical lines keeps a stack of open
//! frames. Two closing conventions compete: the `ここまで` terminator, and
//! indentation once `!インデント構文` has been seen. The directive is one-way
//! and applies from its line to the end of the file.
//!
//! Ill-formed input never aborts the scan; the result is a best-effort tree
//! plus one diagnostic per defect.

use crate::error::{error_args, ErrorInfoManager, MessageId};
use crate::token::{Span, Token, TokenKind, TokenRole};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockKind {
    If,
    Repeat,
    While,
    For,
    Foreach,
    RepeatUntil,
    ErrorWatch,
    PerfMonitor,
    SpeedPriority,
    FuncDef,
}

impl BlockKind {
    fn from_opener(kind: TokenKind) -> Option<BlockKind> {
        Some(match kind {
            TokenKind::If => BlockKind::If,
            TokenKind::Repeat => BlockKind::Repeat,
            TokenKind::While => BlockKind::While,
            TokenKind::For => BlockKind::For,
            TokenKind::Foreach => BlockKind::Foreach,
            TokenKind::RepeatUntil => BlockKind::RepeatUntil,
            TokenKind::ErrorWatch => BlockKind::ErrorWatch,
            TokenKind::PerfMonitor => BlockKind::PerfMonitor,
            TokenKind::SpeedPriority => BlockKind::SpeedPriority,
            TokenKind::FuncDef => BlockKind::FuncDef,
            _ => return None,
        })
    }

    /// Statement name used in diagnostics.
    pub fn label(self) -> &'static str {
        match self {
            BlockKind::If => "もし",
            BlockKind::Repeat => "回",
            BlockKind::While => "間",
            BlockKind::For => "繰り返す",
            BlockKind::Foreach => "反復",
            BlockKind::RepeatUntil => "後判定",
            BlockKind::ErrorWatch => "エラー監視",
            BlockKind::PerfMonitor => "パフォーマンスモニタ適用",
            BlockKind::SpeedPriority => "実行速度優先",
            BlockKind::FuncDef => "関数",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CloseMode {
    Terminator,
    Indent,
}

/// One linked block. Token positions are indices into the token stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    pub kind: BlockKind,
    pub opener: usize,
    /// Clause markers and the terminator, in source order. Each carries a
    /// `LinkRef` back to `opener`.
    pub children: Vec<usize>,
    pub closer: Option<usize>,
    /// Body is `body_start..body_end`.
    pub body_start: usize,
    pub body_end: usize,
    pub parent: Option<BlockId>,
    pub depth: u32,
    pub mode: CloseMode,
    /// Opened and closed on one logical line.
    pub single_line: bool,
    /// Indent level of the opener's line.
    pub indent: u32,
}

impl Block {
    pub fn contains(&self, token: usize) -> bool {
        (self.body_start..self.body_end).contains(&token)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockTree {
    /// In opener order; `BlockId(n)` is `blocks[n]`.
    pub blocks: Vec<Block>,
    /// Token index of the indentation directive, if any.
    pub indent_mode_from: Option<usize>,
}

impl BlockTree {
    pub fn get(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Enclosing blocks of `id`, innermost first, `id` included.
    pub fn ancestors(&self, id: BlockId) -> impl Iterator<Item = &Block> {
        std::iter::successors(self.get(id), move |b| b.parent.and_then(|p| self.get(p)))
    }

    /// Innermost enclosing function definition of `id`.
    pub fn enclosing_func(&self, id: BlockId) -> Option<&Block> {
        self.ancestors(id).find(|b| b.kind == BlockKind::FuncDef)
    }
}

// ──────────────────────────────────────────────
// Logical lines
// ──────────────────────────────────────────────

struct Line {
    /// Grammar tokens, trivia and separators excluded.
    tokens: Vec<usize>,
    /// Index of the separator (`Eol`/`Eof`) that ends the line.
    end: usize,
    indent: u32,
    /// First logical line of its physical line.
    fresh: bool,
}

impl Line {
    /// Position in `tokens` of the last token, ignoring trailing commas.
    fn last_significant(&self, tokens: &[Token]) -> Option<usize> {
        self.tokens
            .iter()
            .rposition(|&i| tokens[i].kind != TokenKind::Comma)
    }

    fn first_fix(&self, tokens: &[Token]) -> Option<TokenKind> {
        self.tokens.first().map(|&i| tokens[i].fix)
    }
}

fn split_lines(tokens: &[Token]) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut current = Vec::new();
    let mut indent = 0u32;
    let mut line_indent = 0u32;
    let mut fresh = true;
    let mut next_fresh = true;
    for (i, tok) in tokens.iter().enumerate() {
        if let Some(ind) = &tok.indent {
            indent = ind.level;
        }
        if tok.is_eol() {
            if !current.is_empty() {
                lines.push(Line {
                    tokens: std::mem::take(&mut current),
                    end: i,
                    indent: line_indent,
                    fresh,
                });
                next_fresh = false;
            }
            if tok.is_line_break() {
                next_fresh = true;
            }
            continue;
        }
        if tok.is_trivia() {
            continue;
        }
        if current.is_empty() {
            line_indent = indent;
            fresh = next_fresh;
        }
        current.push(i);
    }
    lines
}

// ──────────────────────────────────────────────
// Linker
// ──────────────────────────────────────────────

struct Frame {
    block: usize,
    /// `もし` whose `ならば` starts the next line.
    awaiting_then: bool,
}

struct Linker<'a> {
    tokens: &'a mut [Token],
    errors: &'a mut ErrorInfoManager,
    blocks: Vec<Block>,
    stack: Vec<Frame>,
    mode: CloseMode,
    indent_mode_from: Option<usize>,
}

/// Link block structure in place: sets `role` on openers, clauses and
/// terminators, and `block` on every token inside a block body.
pub fn link(tokens: &mut [Token], errors: &mut ErrorInfoManager) -> BlockTree {
    let lines = split_lines(tokens);
    let mut linker = Linker {
        tokens,
        errors,
        blocks: Vec::new(),
        stack: Vec::new(),
        mode: CloseMode::Terminator,
        indent_mode_from: None,
    };
    let mut else_candidate: Option<usize> = None;
    for (n, line) in lines.iter().enumerate() {
        let next_first = lines.get(n + 1).and_then(|l| l.first_fix(linker.tokens));
        else_candidate = linker.line(line, next_first, else_candidate.take());
    }
    linker.finish();

    let Linker {
        tokens,
        blocks,
        indent_mode_from,
        ..
    } = linker;
    for block in &blocks {
        for tok in &mut tokens[block.body_start..block.body_end] {
            tok.block = Some(block.id);
        }
    }
    tracing::debug!(blocks = blocks.len(), indent_mode = indent_mode_from.is_some(), "linked");
    BlockTree {
        blocks,
        indent_mode_from,
    }
}

impl Linker<'_> {
    fn span(&self, idx: usize) -> Span {
        self.tokens[idx].span
    }

    fn open(&mut self, kind: BlockKind, opener: usize, indent: u32, parent: Option<usize>) -> usize {
        let depth = parent.map_or(1, |p| self.blocks[p].depth + 1);
        let id = BlockId(self.blocks.len() as u32);
        self.tokens[opener].role = TokenRole::LinkMain(id);
        self.blocks.push(Block {
            id,
            kind,
            opener,
            children: Vec::new(),
            closer: None,
            body_start: opener + 1,
            body_end: opener + 1,
            parent: parent.map(|p| self.blocks[p].id),
            depth,
            mode: self.mode,
            single_line: false,
            indent,
        });
        self.blocks.len() - 1
    }

    fn attach(&mut self, block: usize, idx: usize) {
        let main = self.blocks[block].opener;
        self.tokens[idx].role = TokenRole::LinkRef { main };
        self.blocks[block].children.push(idx);
    }

    fn misplaced(&mut self, id: MessageId, idx: usize) {
        let statement = self
            .stack
            .last()
            .map_or("なし", |f| self.blocks[f.block].kind.label());
        let args = error_args([
            ("nestLevel", self.stack.len().to_string()),
            ("statement", statement.to_owned()),
        ]);
        let span = self.span(idx);
        self.errors.error(id, args, span);
    }

    /// Close frames whose indent is not deeper than the line's, unless the
    /// line continues the top frame.
    fn close_by_indent(&mut self, line: &Line) {
        let first = line.first_fix(self.tokens);
        let at = line.tokens[0];
        while let Some(top) = self.stack.last() {
            let block = &self.blocks[top.block];
            if block.mode != CloseMode::Indent || block.indent < line.indent {
                break;
            }
            if top.awaiting_then && first == Some(TokenKind::Then) {
                break;
            }
            let same = block.indent == line.indent;
            let clause = matches!(
                (block.kind, first),
                (BlockKind::If, Some(TokenKind::Else))
                    | (BlockKind::ErrorWatch, Some(TokenKind::ErrorNaraba))
            );
            if same && clause {
                break;
            }
            let frame = self.stack.pop();
            if let Some(frame) = frame {
                self.blocks[frame.block].body_end = at;
            }
        }
    }

    /// Index of the first `Then` at or after position `from` of the line.
    fn find_then(&self, line: &Line, from: usize) -> Option<usize> {
        (from..line.tokens.len()).find(|&p| self.tokens[line.tokens[p]].fix == TokenKind::Then)
    }

    /// Scan one logical line. Returns the single-line `もし` that a following
    /// `違えば` line may still join.
    fn line(&mut self, line: &Line, next_first: Option<TokenKind>, else_candidate: Option<usize>) -> Option<usize> {
        if self.mode == CloseMode::Indent && line.fresh {
            self.close_by_indent(line);
        }
        let last = line.last_significant(self.tokens);
        let mut on_line: Vec<usize> = Vec::new();
        let mut joined_else = false;
        let mut p = 0;
        while p < line.tokens.len() {
            let idx = line.tokens[p];
            let fix = self.tokens[idx].fix;
            let is_last = Some(p) == last;
            let parent = on_line.last().copied().or(self.stack.last().map(|f| f.block));
            match fix {
                TokenKind::Pragma => {
                    let directive = line
                        .tokens
                        .get(p + 1)
                        .is_some_and(|&n| self.tokens[n].fix == TokenKind::IndentDirective);
                    if directive && self.mode == CloseMode::Terminator {
                        self.mode = CloseMode::Indent;
                        self.indent_mode_from = Some(idx);
                    }
                }
                TokenKind::If => match self.find_then(line, p + 1) {
                    Some(t) => {
                        let block = self.open(BlockKind::If, idx, line.indent, parent);
                        self.attach(block, line.tokens[t]);
                        if Some(t) == last && on_line.is_empty() {
                            self.stack.push(Frame {
                                block,
                                awaiting_then: false,
                            });
                        } else {
                            on_line.push(block);
                        }
                        p = t;
                    }
                    None if next_first == Some(TokenKind::Then) && on_line.is_empty() => {
                        let block = self.open(BlockKind::If, idx, line.indent, parent);
                        self.stack.push(Frame {
                            block,
                            awaiting_then: true,
                        });
                    }
                    None => {
                        let span = self.span(idx);
                        self.errors.error(MessageId::MustThenFollowIf, error_args([]), span);
                    }
                },
                TokenKind::Then => {
                    let awaiting = match self.stack.last() {
                        Some(f) if p == 0 && f.awaiting_then => Some(f.block),
                        _ => None,
                    };
                    match awaiting {
                        Some(block) => {
                            self.attach(block, idx);
                            if is_last {
                                if let Some(frame) = self.stack.last_mut() {
                                    frame.awaiting_then = false;
                                }
                            } else {
                                self.stack.pop();
                                on_line.push(block);
                            }
                        }
                        None => self.misplaced(MessageId::InvalidTokenNaraba, idx),
                    }
                }
                TokenKind::Else => {
                    let frame_if = self
                        .stack
                        .last()
                        .filter(|f| self.blocks[f.block].kind == BlockKind::If && !f.awaiting_then)
                        .map(|f| f.block);
                    let inline_if = on_line
                        .iter()
                        .rev()
                        .copied()
                        .find(|&b| self.blocks[b].kind == BlockKind::If && !self.has_else(b));
                    // `違えば` alone on its line opens a multi-line branch.
                    let target = if p == 0 {
                        match (frame_if, else_candidate) {
                            (Some(b), _) if is_last => Some(b),
                            (_, Some(b)) => Some(b),
                            (b, _) => b,
                        }
                    } else {
                        inline_if.or(frame_if)
                    };
                    let Some(block) = target else {
                        self.misplaced(MessageId::InvalidTokenChigaeba, idx);
                        p += 1;
                        continue;
                    };
                    self.attach(block, idx);
                    if Some(block) == else_candidate && frame_if != Some(block) {
                        joined_else = true;
                        on_line.push(block);
                    }
                    let else_if = line
                        .tokens
                        .get(p + 1)
                        .is_some_and(|&n| self.tokens[n].fix == TokenKind::If);
                    if else_if {
                        let if_idx = line.tokens[p + 1];
                        self.attach(block, if_idx);
                        match self.find_then(line, p + 2) {
                            Some(t) => {
                                self.attach(block, line.tokens[t]);
                                p = t;
                            }
                            None => {
                                let span = self.span(if_idx);
                                self.errors.error(MessageId::MustThenFollowIf, error_args([]), span);
                                p += 1;
                            }
                        }
                    }
                }
                TokenKind::ErrorNaraba => match self.stack.last() {
                    Some(f) if self.blocks[f.block].kind == BlockKind::ErrorWatch => {
                        let block = f.block;
                        self.attach(block, idx);
                    }
                    _ => self.misplaced(MessageId::InvalidTokenErrorNaraba, idx),
                },
                TokenKind::End => {
                    // A block keeps the closing mode it was opened in.
                    let top_mode = self.stack.last().map(|f| self.blocks[f.block].mode);
                    match top_mode {
                        Some(CloseMode::Terminator) => {
                            if let Some(frame) = self.stack.pop() {
                                self.attach(frame.block, idx);
                                let block = &mut self.blocks[frame.block];
                                block.closer = Some(idx);
                                block.body_end = idx;
                                if block.kind == BlockKind::RepeatUntil {
                                    // The rest of the line is the loop condition.
                                    let cond = last.filter(|&l| {
                                        l > p && self.tokens[line.tokens[l]].fix == TokenKind::While
                                    });
                                    if let Some(l) = cond {
                                        self.attach(frame.block, line.tokens[l]);
                                    }
                                    break;
                                }
                            }
                        }
                        Some(CloseMode::Indent) => {
                            let span = self.span(idx);
                            self.errors.error(MessageId::KokomadeUseInIndentMode, error_args([]), span);
                        }
                        None if self.mode == CloseMode::Indent => {
                            let span = self.span(idx);
                            self.errors.error(MessageId::KokomadeUseInIndentMode, error_args([]), span);
                        }
                        None => {
                            let span = self.span(idx);
                            self.errors.error(
                                MessageId::NoCloseStatement,
                                error_args([("statement", "なし".to_owned())]),
                                span,
                            );
                        }
                    }
                }
                kind => {
                    if let Some(block_kind) = BlockKind::from_opener(kind) {
                        let block = self.open(block_kind, idx, line.indent, parent);
                        // `後判定で繰り返す` is a single opener.
                        let tail = if block_kind == BlockKind::RepeatUntil {
                            self.loop_word_after(line, p)
                        } else {
                            None
                        };
                        if let Some(t) = tail {
                            self.attach(block, line.tokens[t]);
                            p = t;
                        }
                        let opener_last = Some(p) == last;
                        let multi = block_kind == BlockKind::FuncDef || (opener_last && on_line.is_empty());
                        if multi {
                            self.stack.push(Frame {
                                block,
                                awaiting_then: false,
                            });
                        } else {
                            on_line.push(block);
                        }
                    }
                }
            }
            p += 1;
        }

        let outermost: Vec<usize> = on_line
            .iter()
            .copied()
            .filter(|&b| {
                let parent = self.blocks[b].parent;
                !on_line.iter().any(|&o| Some(self.blocks[o].id) == parent)
            })
            .collect();
        for &block in &on_line {
            let b = &mut self.blocks[block];
            b.single_line = true;
            b.body_end = line.end;
        }
        if joined_else {
            return None;
        }
        // A following `違えば` line may still join a one-line `もし`.
        outermost
            .into_iter()
            .rev()
            .find(|&b| self.blocks[b].kind == BlockKind::If && !self.has_else(b))
    }

    fn has_else(&self, block: usize) -> bool {
        self.blocks[block]
            .children
            .iter()
            .any(|&c| self.tokens[c].fix == TokenKind::Else)
    }

    /// Position of a `繰り返す` directly after `後判定` at `p`. A bare `で`
    /// between the two lexes as its own word.
    fn loop_word_after(&self, line: &Line, p: usize) -> Option<usize> {
        let mut q = p + 1;
        let bare_de = line
            .tokens
            .get(q)
            .is_some_and(|&i| self.tokens[i].fix == TokenKind::Word && self.tokens[i].value == "で");
        if bare_de {
            q += 1;
        }
        line.tokens
            .get(q)
            .is_some_and(|&i| self.tokens[i].fix == TokenKind::For)
            .then_some(q)
    }

    fn finish(&mut self) {
        let eof = self.tokens.len().saturating_sub(1);
        while let Some(frame) = self.stack.pop() {
            let block = &mut self.blocks[frame.block];
            block.body_end = eof;
            if block.mode == CloseMode::Terminator {
                let args = error_args([("statement", block.kind.label().to_owned())]);
                let span = self.tokens[block.opener].span;
                self.errors.error(MessageId::NoCloseStatement, args, span);
            }
        }
    }
}
