//! ErrorInfo-to-diagnostic conversion.
//!
//! Each collected [`ErrorInfo`] becomes one `lsp_types::Diagnostic` with the
//! rendered Japanese message and the message id as its code, so editors can
//! filter by id. Ranges go through a [`LineIndex`] so they are in the
//! client's position encoding.

use lsp_types::{Diagnostic, DiagnosticSeverity, NumberOrString};
use nako_core::{ErrorInfo, ErrorLevel};

use crate::position::LineIndex;

pub fn severity(level: ErrorLevel) -> DiagnosticSeverity {
    match level {
        ErrorLevel::Error => DiagnosticSeverity::ERROR,
        ErrorLevel::Warn => DiagnosticSeverity::WARNING,
        ErrorLevel::Info => DiagnosticSeverity::INFORMATION,
        ErrorLevel::Hint => DiagnosticSeverity::HINT,
    }
}

pub fn to_diagnostic(info: &ErrorInfo, index: &LineIndex) -> Diagnostic {
    Diagnostic {
        range: index.range(info.span),
        severity: Some(severity(info.level)),
        code: Some(NumberOrString::String(info.message_id.as_str().to_owned())),
        source: Some("nako".to_string()),
        message: info.message(),
        ..Default::default()
    }
}

/// Convert a diagnostics list, keeping its order.
pub fn to_diagnostics(infos: &[ErrorInfo], index: &LineIndex) -> Vec<Diagnostic> {
    infos.iter().map(|info| to_diagnostic(info, index)).collect()
}
