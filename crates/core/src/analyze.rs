//! Analysis pipeline: Lexer -> BlockLinker -> ScopeResolver over one text.
//!
//! This is a thin orchestrator. Each pass reports into one shared
//! [`ErrorInfoManager`], so the diagnostics come out in pass order.

use crate::config::AnalyzerConfig;
use crate::declare::{DeclRef, Declare, DeclarationTable, ExternalInfo, Import, TableRef};
use crate::error::{ErrorInfo, ErrorInfoManager};
use crate::lexer::lex;
use crate::link::{link, BlockTree};
use crate::resolve::{resolve, scan_pragmas, ResolveContext};
use crate::token::Token;
use std::collections::BTreeMap;

/// Supplies declaration snapshots for the files a source imports.
pub trait ImportResolver {
    /// Snapshot of `import` as seen from `from`, if that file is known.
    fn resolve_import(&self, from: &str, import: &Import) -> Option<ExternalInfo>;
}

/// Knows no other files.
pub struct NoImports;

impl ImportResolver for NoImports {
    fn resolve_import(&self, _from: &str, _import: &Import) -> Option<ExternalInfo> {
        None
    }
}

/// Snapshots keyed by the import path exactly as written.
impl ImportResolver for BTreeMap<String, ExternalInfo> {
    fn resolve_import(&self, _from: &str, import: &Import) -> Option<ExternalInfo> {
        self.get(&import.path).cloned()
    }
}

/// Everything one pass over a text produced.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub tokens: Vec<Token>,
    pub blocks: BlockTree,
    pub table: DeclarationTable,
    /// Snapshots used for cross-file resolution, in import order.
    pub externals: Vec<ExternalInfo>,
    pub diagnostics: Vec<ErrorInfo>,
    /// Diagnostics discarded by the problems limit.
    pub dropped: usize,
}

impl Analysis {
    /// `(uri, generation)` of every dependency snapshot used.
    pub fn dependency_stamp(&self) -> Vec<(String, u64)> {
        self.externals
            .iter()
            .map(|e| (e.uri.clone(), e.generation))
            .collect()
    }

    /// Follow a token's declaration reference into the right table.
    pub fn declaration<'s>(&'s self, r: &DeclRef, catalog: &'s DeclarationTable) -> Option<&'s Declare> {
        match r.table {
            TableRef::Own => self.table.get(r.id),
            TableRef::External(k) => self.externals.get(k as usize)?.table.get(r.id),
            TableRef::Catalog => catalog.get(r.id),
        }
    }
}

/// Run every pass over `text`. Never fails; problems are in `diagnostics`.
pub fn analyze(
    text: &str,
    source: &str,
    imports: &dyn ImportResolver,
    catalog: &DeclarationTable,
    config: &AnalyzerConfig,
) -> Analysis {
    let mut errors = ErrorInfoManager::new(config.problems_limit);

    let mut tokens = lex(text, source, &mut errors);
    let blocks = link(&mut tokens, &mut errors);

    let externals: Vec<ExternalInfo> = scan_pragmas(&tokens)
        .imports
        .iter()
        .filter_map(|import| imports.resolve_import(source, import))
        .collect();
    let ctx = ResolveContext {
        source,
        externals: &externals,
        catalog,
        config,
    };
    let table = resolve(&mut tokens, &blocks, &ctx, &mut errors);

    let dropped = errors.dropped();
    tracing::debug!(
        source,
        tokens = tokens.len(),
        diagnostics = errors.count(),
        dropped,
        "analyzed"
    );
    Analysis {
        tokens,
        blocks,
        table,
        externals,
        diagnostics: errors.into_vec(),
        dropped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::system_catalog;
    use crate::token::TokenRole;
    use std::sync::Arc;

    #[test]
    fn pipeline_runs_all_passes() {
        let catalog = system_catalog();
        let a = analyze(
            "もしAならば\n  「x」を表示\nここまで\n",
            "main.nako3",
            &NoImports,
            &catalog,
            &AnalyzerConfig::default(),
        );
        assert!(a.diagnostics.is_empty(), "{:?}", a.diagnostics);
        assert_eq!(a.blocks.len(), 1);
        let show = a.tokens.iter().find(|t| t.text == "表示").unwrap();
        let decl = a.declaration(show.decl().unwrap(), &catalog).unwrap();
        assert_eq!(decl.name, "表示");
    }

    #[test]
    fn imports_are_resolved_through_the_resolver() {
        let catalog = system_catalog();
        let config = AnalyzerConfig::default();
        let lib = analyze("●二倍とは\nここまで\n", "lib.nako3", &NoImports, &catalog, &config);
        let mut known = BTreeMap::new();
        known.insert(
            "lib.nako3".to_owned(),
            ExternalInfo {
                uri: "file:///p/lib.nako3".into(),
                path: "/p/lib.nako3".into(),
                table: Arc::new(lib.table),
                generation: 7,
            },
        );
        let a = analyze("!「lib.nako3」を取り込む\n二倍\n", "main.nako3", &known, &catalog, &config);
        assert_eq!(a.dependency_stamp(), vec![("file:///p/lib.nako3".to_owned(), 7)]);
        let call = a.tokens.iter().find(|t| t.text == "二倍").unwrap();
        assert!(matches!(call.role, TokenRole::Call { .. }));
        assert_eq!(a.declaration(call.decl().unwrap(), &catalog).unwrap().name, "二倍");
    }

    #[test]
    fn problems_limit_caps_diagnostics() {
        let config = AnalyzerConfig {
            problems_limit: 5,
            ..AnalyzerConfig::default()
        };
        let a = analyze("@@@@@@@@@@", "main.nako3", &NoImports, &system_catalog(), &config);
        assert_eq!(a.diagnostics.len(), 5);
        assert_eq!(a.dropped, 5);
    }
}
