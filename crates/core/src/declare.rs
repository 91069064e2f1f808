//! Declaration records and the per-file declaration table.

use crate::scope::{ScopeId, ScopeTree};
use crate::token::{ParseKind, Span};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeclId(pub u32);

/// Where a declaration came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Plugin,
    Global,
    Local,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tier", rename_all = "lowercase")]
pub enum Tier {
    Global {
        module: String,
        source: String,
        visibility: Visibility,
        /// Declared in a file loaded over http(s).
        remote: bool,
    },
    Local {
        scope: ScopeId,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionArg {
    pub varname: String,
    pub attr: Vec<String>,
    /// Canonical particles this argument accepts.
    pub josi: Vec<String>,
    pub range: Option<Span>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuncInfo {
    pub args: Vec<FunctionArg>,
    pub pure: bool,
    pub is_async: bool,
    /// Accepts any number of arguments; unmatched particles are not hinted.
    pub variadic: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DeclareKind {
    Func(FuncInfo),
    Var,
    Const,
    #[serde(rename = "parameter")]
    Param,
}

impl DeclareKind {
    pub fn parse_kind(&self) -> ParseKind {
        match self {
            DeclareKind::Func(_) => ParseKind::Func,
            DeclareKind::Var => ParseKind::Var,
            DeclareKind::Const => ParseKind::Const,
            DeclareKind::Param => ParseKind::Param,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declare {
    pub name: String,
    /// Key used for lookup: full-width folded, okurigana trimmed.
    pub name_normalized: String,
    pub range: Option<Span>,
    pub origin: Origin,
    /// Token index from which the name is visible. Functions use 0 so they
    /// can be called before their definition.
    pub active_from: usize,
    pub tier: Tier,
    pub kind: DeclareKind,
}

impl Declare {
    pub fn func(&self) -> Option<&FuncInfo> {
        match &self.kind {
            DeclareKind::Func(info) => Some(info),
            _ => None,
        }
    }

    pub fn is_func(&self) -> bool {
        self.func().is_some()
    }

    pub fn is_public(&self) -> bool {
        matches!(
            self.tier,
            Tier::Global {
                visibility: Visibility::Public,
                ..
            }
        )
    }

    pub fn scope(&self) -> ScopeId {
        match self.tier {
            Tier::Local { scope } => scope,
            Tier::Global { .. } => ScopeId::GLOBAL,
        }
    }
}

/// Which table a [`DeclRef`] points into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "table", content = "index", rename_all = "lowercase")]
pub enum TableRef {
    Own,
    /// Position in the externals list handed to the resolver.
    External(u32),
    Catalog,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeclRef {
    pub table: TableRef,
    pub id: DeclId,
}

impl DeclRef {
    pub fn own(id: DeclId) -> Self {
        DeclRef {
            table: TableRef::Own,
            id,
        }
    }
}

/// An `!「path」を取り込む` directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Import {
    pub path: String,
    pub remote: bool,
    pub span: Span,
}

/// Declarations of one imported file, as seen by the importer.
#[derive(Debug, Clone)]
pub struct ExternalInfo {
    pub uri: String,
    pub path: String,
    pub table: Arc<DeclarationTable>,
    /// Analysis counter of the dependency when this snapshot was taken.
    pub generation: u64,
}

// ──────────────────────────────────────────────
// Table
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeclarationTable {
    pub source: String,
    pub module: String,
    pub default_visibility: Visibility,
    pub imports: Vec<Import>,
    pub scopes: ScopeTree,
    decls: Vec<Declare>,
    #[serde(skip)]
    globals: HashMap<String, DeclId>,
    #[serde(skip)]
    locals: HashMap<(ScopeId, String), DeclId>,
}

impl DeclarationTable {
    pub fn new(source: impl Into<String>, module: impl Into<String>) -> Self {
        DeclarationTable {
            source: source.into(),
            module: module.into(),
            default_visibility: Visibility::Public,
            imports: Vec::new(),
            scopes: ScopeTree::new(0),
            decls: Vec::new(),
            globals: HashMap::new(),
            locals: HashMap::new(),
        }
    }

    /// Module name of a source path: its file stem.
    pub fn module_name(source: &str) -> String {
        let file = source.rsplit(['/', '\\']).next().unwrap_or(source);
        file.split('.').next().unwrap_or(file).to_owned()
    }

    /// Insert a declaration. A name already declared in the same scope is
    /// rejected with the existing id; the table is left unchanged.
    pub fn insert(&mut self, decl: Declare) -> Result<DeclId, DeclId> {
        let key = decl.name_normalized.clone();
        let existing = match decl.tier {
            Tier::Global { .. } => self.globals.get(&key),
            Tier::Local { scope } => self.locals.get(&(scope, key.clone())),
        };
        if let Some(&id) = existing {
            return Err(id);
        }
        let id = DeclId(self.decls.len() as u32);
        match decl.tier {
            Tier::Global { .. } => {
                self.globals.insert(key, id);
            }
            Tier::Local { scope } => {
                self.locals.insert((scope, key), id);
            }
        }
        self.decls.push(decl);
        Ok(id)
    }

    pub fn get(&self, id: DeclId) -> Option<&Declare> {
        self.decls.get(id.0 as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = (DeclId, &Declare)> {
        self.decls
            .iter()
            .enumerate()
            .map(|(i, d)| (DeclId(i as u32), d))
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    pub fn global(&self, name: &str) -> Option<DeclId> {
        self.globals.get(name).copied()
    }

    pub fn local(&self, scope: ScopeId, name: &str) -> Option<DeclId> {
        self.locals.get(&(scope, name.to_owned())).copied()
    }

    /// Public global `name`, as seen from an importing file.
    pub fn exported(&self, name: &str) -> Option<DeclId> {
        self.global(name)
            .filter(|&id| self.get(id).is_some_and(Declare::is_public))
    }

    pub fn globals(&self) -> impl Iterator<Item = (DeclId, &Declare)> {
        self.iter().filter(|(_, d)| matches!(d.tier, Tier::Global { .. }))
    }

    pub fn locals_in(&self, scope: ScopeId) -> impl Iterator<Item = (DeclId, &Declare)> {
        self.iter()
            .filter(move |(_, d)| matches!(d.tier, Tier::Local { scope: s } if s == scope))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn global(name: &str, kind: DeclareKind, visibility: Visibility) -> Declare {
        Declare {
            name: name.into(),
            name_normalized: name.into(),
            range: None,
            origin: Origin::Global,
            active_from: 0,
            tier: Tier::Global {
                module: "main".into(),
                source: "main.nako3".into(),
                visibility,
                remote: false,
            },
            kind,
        }
    }

    #[test]
    fn duplicate_in_same_scope_is_rejected() {
        let mut table = DeclarationTable::new("main.nako3", "main");
        let first = table.insert(global("A", DeclareKind::Var, Visibility::Public)).unwrap();
        let dup = table.insert(global("A", DeclareKind::Const, Visibility::Public));
        assert_eq!(dup, Err(first));
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(first).unwrap().kind, DeclareKind::Var);
    }

    #[test]
    fn same_name_in_different_scopes() {
        let mut table = DeclarationTable::new("main.nako3", "main");
        table.insert(global("A", DeclareKind::Var, Visibility::Public)).unwrap();
        let mut local = global("A", DeclareKind::Param, Visibility::Public);
        local.tier = Tier::Local { scope: ScopeId(1) };
        local.origin = Origin::Local;
        let id = table.insert(local).unwrap();
        assert_eq!(table.local(ScopeId(1), "A"), Some(id));
        assert_eq!(table.locals_in(ScopeId(1)).count(), 1);
    }

    #[test]
    fn private_globals_are_not_exported() {
        let mut table = DeclarationTable::new("lib.nako3", "lib");
        table
            .insert(global("秘密", DeclareKind::Func(FuncInfo::default()), Visibility::Private))
            .unwrap();
        table
            .insert(global("公開関数", DeclareKind::Func(FuncInfo::default()), Visibility::Public))
            .unwrap();
        assert!(table.exported("秘密").is_none());
        assert!(table.exported("公開関数").is_some());
    }

    #[test]
    fn module_name_is_file_stem() {
        assert_eq!(DeclarationTable::module_name("/a/b/lib.nako3"), "lib");
        assert_eq!(DeclarationTable::module_name("https://x.test/m.nako3"), "m");
        assert_eq!(DeclarationTable::module_name("main"), "main");
    }

    #[test]
    fn declare_kind_serializes_with_type_tag() {
        let json = serde_json::to_value(DeclareKind::Param).unwrap();
        assert_eq!(json["type"], "parameter");
        let json = serde_json::to_value(DeclareKind::Func(FuncInfo::default())).unwrap();
        assert_eq!(json["type"], "func");
    }
}
