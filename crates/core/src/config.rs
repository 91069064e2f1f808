//! Analyzer configuration.

use serde::{Deserialize, Serialize};

/// Default cap on collected diagnostics per analysis pass.
pub const DEFAULT_PROBLEMS_LIMIT: usize = 100;

/// Knobs for one analysis pass. Every field has a default, so a partial
/// `[analyzer]` table in `nako.toml` is enough.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Maximum number of diagnostics kept; the rest are dropped.
    pub problems_limit: usize,
    /// Emit a hint when a call-site particle matches no declared argument.
    pub hint_unmatched_josi: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        AnalyzerConfig {
            problems_limit: DEFAULT_PROBLEMS_LIMIT,
            hint_unmatched_josi: true,
        }
    }
}
