pub(crate) mod catalog;
pub(crate) mod check;
pub(crate) mod decls;
pub(crate) mod tokens;

use std::path::Path;
use std::process;

use nako_lsp::{AnySource, Project, TreeLoad};
use tokio_util::sync::CancellationToken;

use crate::config::Settings;
use crate::{report_error, OutputFormat};

/// `file://` URI of a local path.
pub(crate) fn file_uri(path: &Path) -> std::io::Result<String> {
    let abs = path.canonicalize()?;
    Ok(format!("file://{}", abs.display()))
}

/// Loads source files and their imports into one project.
pub(crate) struct Loader {
    runtime: tokio::runtime::Runtime,
    source: AnySource,
    cancel: CancellationToken,
    pub project: Project,
}

impl Loader {
    pub fn new(settings: Settings, output: OutputFormat, quiet: bool) -> Self {
        let runtime = match tokio::runtime::Runtime::new() {
            Ok(rt) => rt,
            Err(e) => {
                report_error(&format!("failed to start async runtime: {}", e), output, quiet);
                process::exit(2);
            }
        };
        let cancel = CancellationToken::new();
        let on_interrupt = cancel.clone();
        runtime.spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                on_interrupt.cancel();
            }
        });
        Loader {
            runtime,
            source: AnySource::default(),
            cancel,
            project: Project::new(settings.catalog, settings.analyzer),
        }
    }

    /// Load `path` and everything it imports. Returns the root URI, or
    /// `None` when the root itself could not be read.
    pub fn load(&mut self, path: &Path) -> Option<(String, TreeLoad)> {
        let uri = file_uri(path).ok()?;
        let load = self
            .runtime
            .block_on(self.project.load_tree(&uri, &self.source, &self.cancel));
        self.project.get(&uri)?;
        Some((uri, load))
    }
}

/// Load a single file or exit with an error.
pub(crate) fn load_or_exit(path: &Path, settings: Settings, output: OutputFormat, quiet: bool) -> (Loader, String) {
    let mut loader = Loader::new(settings, output, quiet);
    match loader.load(path) {
        Some((uri, _)) => (loader, uri),
        None => {
            report_error(&format!("error reading file '{}'", path.display()), output, quiet);
            process::exit(1);
        }
    }
}
