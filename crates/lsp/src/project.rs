//! Explicit project context: every known document, the command catalog and
//! the analyzer configuration, plus cancellable loading of import trees.
//!
//! Cross-file resolution reads other documents' declaration snapshots
//! through [`ImportResolver`]. A document's own update never holds a
//! borrow of itself as a dependency.

use crate::document::{Document, VersionMarker};
use crate::source::TextSource;
use nako_core::declare::Import;
use nako_core::plugin::system_catalog;
use nako_core::resolve::scan_pragmas;
use nako_core::{AnalyzerConfig, DeclarationTable, ExternalInfo, ImportResolver};
use std::collections::{BTreeMap, HashSet};
use tokio_util::sync::CancellationToken;

/// Outcome of [`Project::load_tree`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeLoad {
    /// Successfully loaded URIs in pre-order.
    pub visited: Vec<String>,
    /// False when a load failed or the walk was cancelled.
    pub complete: bool,
}

pub struct Project {
    docs: BTreeMap<String, Document>,
    catalog: DeclarationTable,
    config: AnalyzerConfig,
}

impl Default for Project {
    fn default() -> Self {
        Self::new(system_catalog(), AnalyzerConfig::default())
    }
}

impl Project {
    pub fn new(catalog: DeclarationTable, config: AnalyzerConfig) -> Self {
        Project {
            docs: BTreeMap::new(),
            catalog,
            config,
        }
    }

    pub fn catalog(&self) -> &DeclarationTable {
        &self.catalog
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn get(&self, uri: &str) -> Option<&Document> {
        self.docs.get(uri)
    }

    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.docs.values()
    }

    pub fn close(&mut self, uri: &str) -> bool {
        self.docs.remove(uri).is_some()
    }

    /// Update one document with new text. Returns whether it was analysed.
    pub fn update(&mut self, uri: &str, text: &str, marker: VersionMarker) -> bool {
        let mut doc = self.docs.remove(uri).unwrap_or_else(|| Document::new(uri));
        let changed = doc.update_text(text, marker, &*self, &self.catalog, &self.config);
        self.docs.insert(uri.to_owned(), doc);
        changed
    }

    /// Re-analyse one document if any of its dependencies changed.
    pub fn refresh(&mut self, uri: &str) -> bool {
        let Some(mut doc) = self.docs.remove(uri) else {
            return false;
        };
        let changed = doc.refresh(&*self, &self.catalog, &self.config);
        self.docs.insert(uri.to_owned(), doc);
        changed
    }

    /// Snapshots of every import of `uri` that is currently known.
    pub fn externals_for(&self, uri: &str) -> Vec<ExternalInfo> {
        let Some(doc) = self.docs.get(uri) else {
            return Vec::new();
        };
        scan_pragmas(doc.tokens())
            .imports
            .iter()
            .filter_map(|import| self.resolve_import(uri, import))
            .collect()
    }

    /// Absolute URIs of the imports `uri` declares, in source order.
    pub fn import_uris(&self, uri: &str) -> Vec<String> {
        let Some(doc) = self.docs.get(uri) else {
            return Vec::new();
        };
        doc.declarations()
            .imports
            .iter()
            .map(|import| resolve_uri(uri, &import.path))
            .collect()
    }

    // ── Loading ──────────────────────────────────────────────────────

    /// Fetch `uri` from `source` and update its document. Cancellation is
    /// checked before and after the fetch; a cancelled or failed load
    /// returns false and leaves the cached document untouched.
    pub async fn load(
        &mut self,
        uri: &str,
        source: &dyn TextSource,
        cancel: &CancellationToken,
    ) -> bool {
        if cancel.is_cancelled() {
            tracing::debug!(uri, "load cancelled before fetch");
            return false;
        }
        let fetched = match source.fetch(uri, cancel).await {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!(uri, error = %e, "load failed");
                return false;
            }
        };
        if cancel.is_cancelled() {
            tracing::debug!(uri, "load cancelled after fetch");
            return false;
        }
        self.update(uri, &fetched.text, fetched.marker);
        true
    }

    /// Load `root` and everything it transitively imports, each file once,
    /// in pre-order. Dependencies are loaded after their importers, so the
    /// loaded documents are refreshed afterwards, deepest first.
    pub async fn load_tree(
        &mut self,
        root: &str,
        source: &dyn TextSource,
        cancel: &CancellationToken,
    ) -> TreeLoad {
        let mut visited = Vec::new();
        let mut seen = HashSet::new();
        let mut worklist = vec![root.to_owned()];
        let mut complete = true;

        while let Some(uri) = worklist.pop() {
            if !seen.insert(uri.clone()) {
                continue;
            }
            if cancel.is_cancelled() {
                complete = false;
                break;
            }
            if !self.load(&uri, source, cancel).await {
                complete = false;
                if cancel.is_cancelled() {
                    break;
                }
                continue;
            }
            let children = self.import_uris(&uri);
            worklist.extend(children.into_iter().rev().filter(|c| !seen.contains(c)));
            visited.push(uri);
        }

        for uri in visited.iter().rev() {
            self.refresh(uri);
        }
        tracing::debug!(root, loaded = visited.len(), complete, "import tree loaded");
        TreeLoad { visited, complete }
    }
}

impl ImportResolver for Project {
    fn resolve_import(&self, from: &str, import: &Import) -> Option<ExternalInfo> {
        let uri = resolve_uri(from, &import.path);
        self.docs.get(&uri).map(Document::external_info)
    }
}

// ──────────────────────────────────────────────
// URI arithmetic
// ──────────────────────────────────────────────

/// Resolve an import path against the URI of the importing file.
pub fn resolve_uri(base: &str, import: &str) -> String {
    if import.contains("://") {
        let (prefix, path) = split_authority(import);
        return format!("{}{}", prefix, normalize_path(path));
    }
    let (prefix, base_path) = split_authority(base);
    let joined = if import.starts_with('/') {
        import.to_owned()
    } else {
        match base_path.rfind('/') {
            Some(slash) => format!("{}/{}", &base_path[..slash], import),
            None => import.to_owned(),
        }
    };
    format!("{}{}", prefix, normalize_path(&joined))
}

/// Split `scheme://authority` from the path. URIs without a scheme have an
/// empty prefix.
fn split_authority(uri: &str) -> (&str, &str) {
    let Some(scheme_end) = uri.find("://") else {
        return ("", uri);
    };
    let after = scheme_end + 3;
    match uri[after..].find('/') {
        Some(slash) => uri.split_at(after + slash),
        None => (uri, ""),
    }
}

/// Resolve `.` and `..` segments.
fn normalize_path(path: &str) -> String {
    let mut components: Vec<&str> = Vec::new();
    for component in path.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                // pop unless we are at root
                components.pop();
            }
            other => components.push(other),
        }
    }
    let joined = components.join("/");
    if path.starts_with('/') {
        format!("/{}", joined)
    } else {
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_path_resolves_dot_and_dotdot() {
        assert_eq!(normalize_path("/a/b/../c/./d"), "/a/c/d");
        assert_eq!(normalize_path("/../a"), "/a");
        assert_eq!(normalize_path("a/./b"), "a/b");
    }

    #[test]
    fn relative_imports_resolve_against_the_importer() {
        assert_eq!(
            resolve_uri("file:///p/src/main.nako3", "lib.nako3"),
            "file:///p/src/lib.nako3"
        );
        assert_eq!(
            resolve_uri("file:///p/src/main.nako3", "../share/util.nako3"),
            "file:///p/share/util.nako3"
        );
        assert_eq!(
            resolve_uri("https://x.test/a/main.nako3", "./b.nako3"),
            "https://x.test/a/b.nako3"
        );
        assert_eq!(
            resolve_uri("file:///p/main.nako3", "https://x.test/lib.nako3"),
            "https://x.test/lib.nako3"
        );
        assert_eq!(resolve_uri("main.nako3", "lib.nako3"), "lib.nako3");
    }

    #[test]
    fn importer_sees_dependency_declarations() {
        let mut project = Project::default();
        project.update("file:///p/lib.nako3", "●二倍とは\nここまで\n", VersionMarker::Version(1));
        project.update(
            "file:///p/main.nako3",
            "!「lib.nako3」を取り込む\n二倍\n",
            VersionMarker::Version(1),
        );
        let externals = project.externals_for("file:///p/main.nako3");
        assert_eq!(externals.len(), 1);
        assert_eq!(externals[0].uri, "file:///p/lib.nako3");
        assert_eq!(externals[0].path, "/p/lib.nako3");
    }

    #[test]
    fn dependency_change_triggers_refresh() {
        let mut project = Project::default();
        let main = "file:///p/main.nako3";
        let lib = "file:///p/lib.nako3";
        project.update(lib, "●二倍とは\nここまで\n", VersionMarker::Version(1));
        project.update(main, "!「lib.nako3」を取り込む\n二倍\n", VersionMarker::Version(1));
        assert!(!project.refresh(main));

        project.update(lib, "●三倍とは\nここまで\n", VersionMarker::Version(2));
        assert!(project.refresh(main));
        assert!(!project.update(main, "!「lib.nako3」を取り込む\n二倍\n", VersionMarker::Version(1)));
    }
}
