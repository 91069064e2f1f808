//! Declaration and scope resolution over a linked token stream.
//!
//! Two passes. The first collects every `●` function definition so calls may
//! precede the definition; it also builds one scope per definition. The
//! second walks statements left to right, declaring variables and constants,
//! classifying references, and binding call-site particles to arguments.

use crate::config::AnalyzerConfig;
use crate::declare::{
    DeclId, DeclRef, Declare, DeclarationTable, DeclareKind, ExternalInfo, FuncInfo, FunctionArg,
    Import, Origin, TableRef, Tier, Visibility,
};
use crate::error::{error_args, ErrorInfoManager, MessageId};
use crate::link::{BlockKind, BlockTree};
use crate::scope::{ScopeId, ScopeTree};
use crate::token::{Access, ArgBinding, Token, TokenKind, TokenRole};
use std::collections::HashMap;

/// Particles that make a function name a value rather than a call.
pub const POINTER_JOSI: &[&str] = &["を", "に", "へ", "が", "は", "の", "から", "まで"];

const VISIBILITY_PRAGMA: &str = "モジュール公開既定値";

/// Read-only inputs of one resolve pass.
pub struct ResolveContext<'a> {
    pub source: &'a str,
    /// Imported files, in import order.
    pub externals: &'a [ExternalInfo],
    pub catalog: &'a DeclarationTable,
    pub config: &'a AnalyzerConfig,
}

/// File-level directives found on `!` lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pragmas {
    pub imports: Vec<Import>,
    pub default_visibility: Visibility,
}

/// Collect imports and the module visibility default.
pub fn scan_pragmas(tokens: &[Token]) -> Pragmas {
    let mut pragmas = Pragmas::default();
    for (i, tok) in tokens.iter().enumerate() {
        if tok.kind != TokenKind::Pragma {
            continue;
        }
        let line: Vec<&Token> = tokens[i + 1..]
            .iter()
            .take_while(|t| !t.is_eol())
            .filter(|t| !t.is_trivia())
            .collect();
        match line.as_slice() {
            [path, import, ..]
                if is_string(path.kind) && import.fix == TokenKind::Import =>
            {
                let remote = path.value.starts_with("http://") || path.value.starts_with("https://");
                pragmas.imports.push(Import {
                    path: path.value.clone(),
                    remote,
                    span: path.span,
                });
            }
            [key, value, ..] if key.value == VISIBILITY_PRAGMA && is_string(value.kind) => {
                match value.value.as_str() {
                    "非公開" => pragmas.default_visibility = Visibility::Private,
                    "公開" => pragmas.default_visibility = Visibility::Public,
                    _ => {}
                }
            }
            _ => {}
        }
    }
    pragmas
}

fn is_string(kind: TokenKind) -> bool {
    matches!(kind, TokenKind::String | TokenKind::Template)
}

/// Resolve declarations and references. Sets `role` and `parse` on tokens
/// and returns the file's declaration table.
pub fn resolve(
    tokens: &mut [Token],
    blocks: &BlockTree,
    ctx: &ResolveContext<'_>,
    errors: &mut ErrorInfoManager,
) -> DeclarationTable {
    let pragmas = scan_pragmas(tokens);
    let mut table = DeclarationTable::new(ctx.source, DeclarationTable::module_name(ctx.source));
    table.imports = pragmas.imports;
    table.default_visibility = pragmas.default_visibility;
    table.scopes = ScopeTree::new(tokens.len());

    let mut resolver = Resolver {
        tokens,
        blocks,
        ctx,
        errors,
        table,
        headers: HashMap::new(),
    };
    resolver.collect_functions();
    resolver.walk();

    let table = resolver.table;
    tracing::debug!(
        source = ctx.source,
        decls = table.len(),
        scopes = table.scopes.len(),
        "resolved"
    );
    table
}

// ──────────────────────────────────────────────
// Function headers
// ──────────────────────────────────────────────

struct Header {
    name: usize,
    info: FuncInfo,
    visibility: Option<Visibility>,
    /// (token index, argument index) of every parameter mention.
    params: Vec<(usize, usize)>,
}

/// Parse `●[{attrs}][(args)]name[(args)][とは]` between `from` and `to`.
fn parse_header(tokens: &[Token], from: usize, to: usize) -> Option<Header> {
    let mut info = FuncInfo::default();
    let mut visibility = None;
    let mut params = Vec::new();
    let mut name = None;
    let mut i = from;

    if tokens.get(i).is_some_and(|t| t.kind == TokenKind::LBrace) {
        let (attrs, next) = read_attrs(tokens, i + 1, to);
        for attr in attrs {
            match attr.as_str() {
                "公開" => visibility = Some(Visibility::Public),
                "非公開" => visibility = Some(Visibility::Private),
                "非同期" => info.is_async = true,
                "純粋" => info.pure = true,
                "可変" => info.variadic = true,
                _ => {}
            }
        }
        i = next;
    }

    while i < to {
        let tok = &tokens[i];
        match tok.kind {
            TokenKind::LParen => {
                i = parse_args(tokens, i + 1, to, &mut info, &mut params);
                continue;
            }
            TokenKind::Word if name.is_none() && !tok.is_trivia() => name = Some(i),
            _ => {}
        }
        i += 1;
    }

    Some(Header {
        name: name?,
        info,
        visibility,
        params,
    })
}

/// Words up to the closing brace; returns them and the index after it.
fn read_attrs(tokens: &[Token], from: usize, to: usize) -> (Vec<String>, usize) {
    let mut attrs = Vec::new();
    let mut i = from;
    while i < to && tokens[i].kind != TokenKind::RBrace {
        if tokens[i].kind == TokenKind::Word {
            attrs.push(tokens[i].text.clone());
        }
        i += 1;
    }
    (attrs, (i + 1).min(to))
}

/// Argument list up to the closing parenthesis. `Aと|Aを` merges both
/// particles into one argument.
fn parse_args(
    tokens: &[Token],
    from: usize,
    to: usize,
    info: &mut FuncInfo,
    params: &mut Vec<(usize, usize)>,
) -> usize {
    let mut attr = Vec::new();
    let mut i = from;
    while i < to && tokens[i].kind != TokenKind::RParen {
        let tok = &tokens[i];
        match tok.kind {
            TokenKind::LBrace => {
                let (attrs, next) = read_attrs(tokens, i + 1, to);
                attr.extend(attrs);
                i = next;
                continue;
            }
            TokenKind::Word => {
                let k = match info.args.iter().position(|a| a.varname == tok.value) {
                    Some(k) => k,
                    None => {
                        info.args.push(FunctionArg {
                            varname: tok.value.clone(),
                            attr: std::mem::take(&mut attr),
                            josi: Vec::new(),
                            range: Some(tok.span),
                        });
                        info.args.len() - 1
                    }
                };
                if let Some(josi) = tok.josi() {
                    if !info.args[k].josi.iter().any(|j| j == josi) {
                        info.args[k].josi.push(josi.to_owned());
                    }
                }
                params.push((i, k));
            }
            _ => {}
        }
        i += 1;
    }
    (i + 1).min(to)
}

// ──────────────────────────────────────────────
// Resolver
// ──────────────────────────────────────────────

/// Statement state while walking.
#[derive(Default)]
struct Stmt {
    start: usize,
    has_token: bool,
    prev: Option<usize>,
    last_call: Option<usize>,
}

impl Stmt {
    fn reset(&mut self, start: usize) {
        *self = Stmt {
            start,
            ..Stmt::default()
        };
    }
}

struct Resolver<'a> {
    tokens: &'a mut [Token],
    blocks: &'a BlockTree,
    ctx: &'a ResolveContext<'a>,
    errors: &'a mut ErrorInfoManager,
    table: DeclarationTable,
    /// Function opener → end of its header line.
    headers: HashMap<usize, usize>,
}

impl<'a> Resolver<'a> {
    fn global_tier(&self, visibility: Visibility) -> Tier {
        Tier::Global {
            module: self.table.module.clone(),
            source: self.table.source.clone(),
            visibility,
            remote: false,
        }
    }

    fn set_ref(&mut self, idx: usize, decl: DeclRef, kind: &DeclareKind, access: Access) {
        let tok = &mut self.tokens[idx];
        tok.parse = kind.parse_kind();
        tok.role = TokenRole::Reference { decl, access };
    }

    fn warn_duplicate(&mut self, idx: usize, first: DeclId) {
        let line = self
            .table
            .get(first)
            .and_then(|d| d.range)
            .map_or(0, |r| r.start.line + 1);
        let args = error_args([
            ("name", self.tokens[idx].text.clone()),
            ("line", line.to_string()),
        ]);
        let span = self.tokens[idx].span;
        self.errors.warn(MessageId::AlreadyDeclared, args, span);
    }

    // ── Pass 1 ───────────────────────────────────────────────────────

    fn collect_functions(&mut self) {
        let blocks = self.blocks;
        for block in blocks.blocks.iter().filter(|b| b.kind == BlockKind::FuncDef) {
            let opener = block.opener;
            let header_end = (opener..self.tokens.len())
                .find(|&i| self.tokens[i].is_eol())
                .unwrap_or(self.tokens.len());
            self.headers.insert(opener, header_end);
            let Some(header) = parse_header(self.tokens, opener + 1, header_end) else {
                continue;
            };

            let name_tok = &self.tokens[header.name];
            let (name, name_normalized, span) =
                (name_tok.text.clone(), name_tok.value.clone(), name_tok.span);
            if block.parent.is_some() {
                self.errors.error(
                    MessageId::DeclareFuncMustGlobal,
                    error_args([("name", name.clone())]),
                    span,
                );
            }

            let visibility = header.visibility.unwrap_or(self.table.default_visibility);
            let kind = DeclareKind::Func(header.info.clone());
            let decl = Declare {
                name,
                name_normalized: name_normalized.clone(),
                range: Some(span),
                origin: Origin::Global,
                active_from: 0,
                tier: self.global_tier(visibility),
                kind: kind.clone(),
            };
            match self.table.insert(decl) {
                Ok(id) => self.set_ref(header.name, DeclRef::own(id), &kind, Access::Declare),
                Err(first) => {
                    self.warn_duplicate(header.name, first);
                    self.set_ref(header.name, DeclRef::own(first), &kind, Access::Write);
                }
            }

            let scope = self
                .table
                .scopes
                .push(opener, block.body_end, Some(name_normalized));
            let mut arg_ids = Vec::with_capacity(header.info.args.len());
            for arg in &header.info.args {
                let decl = Declare {
                    name: arg.varname.clone(),
                    name_normalized: arg.varname.clone(),
                    range: arg.range,
                    origin: Origin::Local,
                    active_from: opener,
                    tier: Tier::Local { scope },
                    kind: DeclareKind::Param,
                };
                arg_ids.push(self.table.insert(decl).unwrap_or_else(|id| id));
            }
            for (tok, k) in header.params {
                self.set_ref(tok, DeclRef::own(arg_ids[k]), &DeclareKind::Param, Access::Declare);
            }
        }
    }

    // ── Pass 2 ───────────────────────────────────────────────────────

    fn walk(&mut self) {
        let mut stmt = Stmt::default();
        let mut i = 0;
        while i < self.tokens.len() {
            if let Some(&end) = self.headers.get(&i) {
                i = end;
                continue;
            }
            let tok = &self.tokens[i];
            if tok.is_trivia() {
                i += 1;
                continue;
            }
            if tok.kind == TokenKind::Pragma {
                while i < self.tokens.len() && !self.tokens[i].is_eol() {
                    i += 1;
                }
                continue;
            }
            if tok.is_eol() || matches!(tok.fix, TokenKind::Then | TokenKind::Else) {
                stmt.reset(i + 1);
                i += 1;
                continue;
            }
            if tok.kind == TokenKind::Comma && !stmt.has_token {
                stmt.reset(i + 1);
                i += 1;
                continue;
            }
            if matches!(tok.fix, TokenKind::Word | TokenKind::Sore) {
                self.word(i, &mut stmt);
            }
            stmt.has_token = true;
            stmt.prev = Some(i);
            i += 1;
        }
    }

    fn next_significant(&self, i: usize) -> Option<&Token> {
        self.tokens[i + 1..].iter().find(|t| !t.is_trivia())
    }

    fn word(&mut self, i: usize, stmt: &mut Stmt) {
        let scope = self.table.scopes.innermost_at(i);
        let name = self.tokens[i].value.clone();
        let josi = self.tokens[i].josi().map(str::to_owned);
        let next_is_eq = self
            .next_significant(i)
            .is_some_and(|t| t.kind == TokenKind::Eq);
        let is_target = !stmt.has_token && (josi.as_deref() == Some("は") || next_is_eq);

        let declarator = stmt.prev.map(|p| self.tokens[p].fix);
        match declarator {
            Some(TokenKind::Var) if self.tokens[i].fix == TokenKind::Word => {
                self.declare_here(i, scope, DeclareKind::Var, true);
                return;
            }
            Some(TokenKind::Const) if self.tokens[i].fix == TokenKind::Word => {
                self.declare_here(i, scope, DeclareKind::Const, true);
                return;
            }
            _ => {}
        }

        match self.lookup(&name, scope, i) {
            Some((decl, DeclareKind::Func(info))) => {
                let kind = DeclareKind::Func(FuncInfo::default());
                if josi.as_deref().is_some_and(|j| POINTER_JOSI.contains(&j)) {
                    self.set_ref(i, decl, &kind, Access::Pointer);
                    return;
                }
                let args = self.bind_args(i, &info, stmt);
                let tok = &mut self.tokens[i];
                tok.parse = kind.parse_kind();
                tok.role = TokenRole::Call { decl, args };
                stmt.last_call = Some(i);
            }
            Some((decl, kind)) if is_target => {
                if kind == DeclareKind::Const {
                    let args = error_args([("name", self.tokens[i].text.clone())]);
                    let span = self.tokens[i].span;
                    self.errors.warn(MessageId::AssignToConst, args, span);
                }
                self.set_ref(i, decl, &kind, Access::Write);
            }
            Some((decl, kind)) => self.set_ref(i, decl, &kind, Access::Read),
            None if is_target && self.tokens[i].fix == TokenKind::Word => {
                self.declare_here(i, scope, DeclareKind::Var, false);
            }
            None => {}
        }
    }

    /// Declare the word at `i` in `scope`. An explicit duplicate warns and
    /// the token refers to the first declaration.
    fn declare_here(&mut self, i: usize, scope: ScopeId, kind: DeclareKind, explicit: bool) {
        let tok = &self.tokens[i];
        let (tier, origin) = if scope.is_global() {
            (self.global_tier(self.table.default_visibility), Origin::Global)
        } else {
            (Tier::Local { scope }, Origin::Local)
        };
        let decl = Declare {
            name: tok.text.clone(),
            name_normalized: tok.value.clone(),
            range: Some(tok.span),
            origin,
            active_from: i,
            tier,
            kind: kind.clone(),
        };
        match self.table.insert(decl) {
            Ok(id) => self.set_ref(i, DeclRef::own(id), &kind, Access::Declare),
            Err(first) => {
                if explicit {
                    self.warn_duplicate(i, first);
                }
                let first_kind = self
                    .table
                    .get(first)
                    .map_or(kind, |d| d.kind.clone());
                self.set_ref(i, DeclRef::own(first), &first_kind, Access::Write);
            }
        }
    }

    /// Local chain (innermost first), own globals, exported globals of
    /// imports in order, then the catalog.
    fn lookup(&self, name: &str, scope: ScopeId, at: usize) -> Option<(DeclRef, DeclareKind)> {
        let active = |id: DeclId| {
            self.table
                .get(id)
                .filter(|d| d.active_from <= at)
                .map(|d| (DeclRef::own(id), d.kind.clone()))
        };
        for s in self.table.scopes.chain(scope) {
            if s.is_global() {
                break;
            }
            if let Some(found) = self.table.local(s, name).and_then(active) {
                return Some(found);
            }
        }
        if let Some(found) = self.table.global(name).and_then(active) {
            return Some(found);
        }
        for (k, ext) in self.ctx.externals.iter().enumerate() {
            if let Some(id) = ext.table.exported(name) {
                let kind = ext.table.get(id)?.kind.clone();
                let decl = DeclRef {
                    table: TableRef::External(k as u32),
                    id,
                };
                return Some((decl, kind));
            }
        }
        let catalog = self.ctx.catalog;
        let id = catalog.global(name)?;
        let kind = catalog.get(id)?.kind.clone();
        Some((
            DeclRef {
                table: TableRef::Catalog,
                id,
            },
            kind,
        ))
    }

    /// Bind the particles of the values written before call token `i` to
    /// the function's arguments. Candidates lie in the same statement, after
    /// the previous call, at the call's bracket depth.
    fn bind_args(&mut self, i: usize, info: &FuncInfo, stmt: &Stmt) -> Vec<ArgBinding> {
        let lower = stmt.last_call.map_or(stmt.start, |c| c + 1).max(stmt.start);
        let mut depth = 0i32;
        let mut seen = Vec::new();
        for j in lower..i {
            let tok = &self.tokens[j];
            match tok.kind {
                TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace | TokenKind::InjectStart => {
                    depth += 1;
                    continue;
                }
                TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace | TokenKind::InjectEnd => {
                    depth -= 1;
                }
                _ => {}
            }
            seen.push((j, depth));
        }
        let candidates: Vec<usize> = seen
            .into_iter()
            .filter(|&(_, d)| d == depth)
            .map(|(j, _)| j)
            .filter(|&j| self.is_argument(j))
            .collect();

        let mut used = vec![false; info.args.len()];
        let mut bindings = Vec::with_capacity(candidates.len());
        for j in candidates {
            let josi = self.tokens[j].josi().unwrap_or_default();
            let arg = info
                .args
                .iter()
                .enumerate()
                .position(|(k, a)| !used[k] && a.josi.iter().any(|x| x == josi));
            match arg {
                Some(k) => used[k] = true,
                None if self.ctx.config.hint_unmatched_josi && !info.variadic => {
                    let surface = self.tokens[j]
                        .josi
                        .as_ref()
                        .map(|a| a.text.clone())
                        .unwrap_or_default();
                    let args = error_args([
                        ("josi", surface),
                        ("func", self.tokens[i].text.clone()),
                    ]);
                    let span = self.tokens[j].span;
                    self.errors.hint(MessageId::JosiNotMatched, args, span);
                }
                None => {}
            }
            bindings.push(ArgBinding { token: j, arg });
        }
        bindings
    }

    /// A value token carrying a particle that is not itself an assignment
    /// target or declaration.
    fn is_argument(&self, j: usize) -> bool {
        let tok = &self.tokens[j];
        if !tok.kind.is_value() || tok.josi.is_none() {
            return false;
        }
        if tok.fix.is_reserved() && tok.fix != TokenKind::Sore {
            return false;
        }
        !matches!(
            tok.role,
            TokenRole::Reference {
                access: Access::Write | Access::Declare,
                ..
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;
    use crate::link::link;
    use crate::plugin::system_catalog;
    use crate::token::ParseKind;

    struct Resolved {
        tokens: Vec<Token>,
        table: DeclarationTable,
        errors: ErrorInfoManager,
    }

    fn run(src: &str) -> Resolved {
        run_with(src, &[])
    }

    fn run_with(src: &str, externals: &[ExternalInfo]) -> Resolved {
        let mut errors = ErrorInfoManager::default();
        let mut tokens = lex(src, "main.nako3", &mut errors);
        let blocks = link(&mut tokens, &mut errors);
        let catalog = system_catalog();
        let config = AnalyzerConfig::default();
        let ctx = ResolveContext {
            source: "main.nako3",
            externals,
            catalog: &catalog,
            config: &config,
        };
        let table = resolve(&mut tokens, &blocks, &ctx, &mut errors);
        Resolved {
            tokens,
            table,
            errors,
        }
    }

    fn nth<'t>(tokens: &'t [Token], text: &str, n: usize) -> &'t Token {
        tokens
            .iter()
            .filter(|t| t.text == text)
            .nth(n)
            .unwrap_or_else(|| panic!("no token {text:?} #{n}"))
    }

    fn ids(errors: &ErrorInfoManager) -> Vec<MessageId> {
        errors.all().iter().map(|e| e.message_id).collect()
    }

    const ADD: &str = "●(AにBと|Bを)足すとは\n  Aを表示\nここまで\n";

    #[test]
    fn header_merges_alternatives() {
        let r = run(ADD);
        let id = r.table.global("足").unwrap();
        let info = r.table.get(id).unwrap().func().unwrap().clone();
        assert_eq!(info.args.len(), 2);
        assert_eq!(info.args[0].varname, "A");
        assert_eq!(info.args[0].josi, vec!["に"]);
        assert_eq!(info.args[1].josi, vec!["と", "を"]);
        assert_eq!(r.table.scopes.len(), 2);
        assert_eq!(r.table.locals_in(ScopeId(1)).count(), 2);
    }

    #[test]
    fn particles_bind_in_either_order() {
        let r = run(&format!("{ADD}3と5に足す\n5に3と足す\n"));
        assert!(ids(&r.errors).is_empty(), "{:?}", r.errors.all());
        // occurrence 0 is the definition itself
        for n in 1..3 {
            let call = nth(&r.tokens, "足す", n);
            let TokenRole::Call { args, .. } = &call.role else {
                panic!("not a call: {:?}", call.role);
            };
            assert_eq!(args.len(), 2);
            for binding in args {
                let expected = match r.tokens[binding.token].josi() {
                    Some("に") => Some(0),
                    Some("と") => Some(1),
                    other => panic!("unexpected particle {other:?}"),
                };
                assert_eq!(binding.arg, expected);
            }
        }
    }

    #[test]
    fn unmatched_particle_is_unbound_hint() {
        let r = run(&format!("{ADD}3で5に足す\n"));
        assert_eq!(ids(&r.errors), vec![MessageId::JosiNotMatched]);
        assert_eq!(r.errors.all()[0].level, crate::error::ErrorLevel::Hint);
        let TokenRole::Call { args, .. } = &nth(&r.tokens, "足す", 1).role else {
            panic!("not a call");
        };
        assert_eq!(args[0].arg, None);
        assert_eq!(args[1].arg, Some(0));
    }

    #[test]
    fn forward_reference_to_function() {
        let r = run("3と5に足す\n●(AにBと)足すとは\nここまで\n");
        assert!(matches!(nth(&r.tokens, "足す", 0).role, TokenRole::Call { .. }));
    }

    #[test]
    fn parameters_are_local_reads() {
        let r = run(ADD);
        let a = nth(&r.tokens, "A", 1);
        assert_eq!(a.parse, ParseKind::Param);
        assert!(matches!(a.role, TokenRole::Reference { access: Access::Read, .. }));
        let show = nth(&r.tokens, "表示", 0);
        let TokenRole::Call { decl, args } = &show.role else {
            panic!("not a call");
        };
        assert_eq!(decl.table, TableRef::Catalog);
        assert_eq!(args[0].arg, Some(0));
    }

    #[test]
    fn implicit_and_explicit_variables() {
        let r = run("Aは5\nAを表示\n変数B\n定数C=3\n");
        let a0 = nth(&r.tokens, "A", 0);
        assert_eq!(a0.parse, ParseKind::Var);
        assert!(matches!(a0.role, TokenRole::Reference { access: Access::Declare, .. }));
        let a1 = nth(&r.tokens, "A", 1);
        assert!(matches!(a1.role, TokenRole::Reference { access: Access::Read, .. }));
        assert_eq!(nth(&r.tokens, "B", 0).parse, ParseKind::Var);
        assert_eq!(nth(&r.tokens, "C", 0).parse, ParseKind::Const);
        assert!(ids(&r.errors).is_empty());
    }

    #[test]
    fn locals_do_not_leak() {
        let r = run("●fとは\n  Bは1\n  Bを表示\nここまで\nBを表示\n");
        let inner = nth(&r.tokens, "B", 1);
        assert!(matches!(inner.role, TokenRole::Reference { access: Access::Read, .. }));
        let b_id = r.table.local(ScopeId(1), "B").unwrap();
        assert_eq!(r.table.get(b_id).unwrap().origin, Origin::Local);
        assert_eq!(nth(&r.tokens, "B", 2).role, TokenRole::Plain);
        assert!(r.table.scopes.is_forest());
    }

    #[test]
    fn local_shadows_global() {
        let r = run("Aは1\n●(Aを)fとは\n  Aを表示\nここまで\n");
        let inner = nth(&r.tokens, "A", 2);
        assert_eq!(inner.parse, ParseKind::Param);
    }

    #[test]
    fn assign_to_const_warns() {
        let r = run("定数Aは5\nAは6\n");
        assert_eq!(ids(&r.errors), vec![MessageId::AssignToConst]);
    }

    #[test]
    fn duplicate_declarations_warn_and_keep_first() {
        let r = run("変数A\n変数A\n●fとは\nここまで\n●fとは\nここまで\n");
        assert_eq!(
            ids(&r.errors),
            vec![MessageId::AlreadyDeclared, MessageId::AlreadyDeclared]
        );
        let mut lines: Vec<&str> = r.errors.all().iter().map(|e| e.args["line"].as_str()).collect();
        lines.sort();
        assert_eq!(lines, vec!["1", "3"]);
        assert_eq!(r.table.globals().count(), 2);
    }

    #[test]
    fn function_inside_block_must_be_global() {
        let r = run("3回\n  ●fとは\n  ここまで\nここまで\n");
        assert_eq!(ids(&r.errors), vec![MessageId::DeclareFuncMustGlobal]);
        assert!(r.table.global("f").is_some());
    }

    #[test]
    fn function_with_value_particle_is_pointer() {
        let r = run("●fとは\nここまで\nFはfを\n");
        let f = nth(&r.tokens, "f", 1);
        assert!(matches!(f.role, TokenRole::Reference { access: Access::Pointer, .. }));
    }

    #[test]
    fn attributes_and_visibility_pragma() {
        let r = run("!モジュール公開既定値は「非公開」\n●{公開}gとは\nここまで\n●{非同期}hとは\nここまで\n");
        let g = r.table.get(r.table.global("g").unwrap()).unwrap();
        assert!(g.is_public());
        let h = r.table.get(r.table.global("h").unwrap()).unwrap();
        assert!(!h.is_public());
        assert!(h.func().unwrap().is_async);
    }

    #[test]
    fn imports_are_collected() {
        let r = run("!「lib.nako3」を取り込む\n!「https://example.com/x.nako3」を取り込む\n");
        assert_eq!(r.table.imports.len(), 2);
        assert!(!r.table.imports[0].remote);
        assert!(r.table.imports[1].remote);
    }

    #[test]
    fn external_exports_resolve_after_own_globals() {
        let lib = run("●(Aを)二倍とは\nここまで\n●{非公開}内部とは\nここまで\n");
        let ext = ExternalInfo {
            uri: "file:///lib.nako3".into(),
            path: "lib.nako3".into(),
            table: std::sync::Arc::new(lib.table),
            generation: 1,
        };
        let r = run_with("3を二倍\n内部\n", std::slice::from_ref(&ext));
        let TokenRole::Call { decl, .. } = &nth(&r.tokens, "二倍", 0).role else {
            panic!("not a call");
        };
        assert_eq!(decl.table, TableRef::External(0));
        assert_eq!(nth(&r.tokens, "内部", 0).role, TokenRole::Plain);
    }
}
