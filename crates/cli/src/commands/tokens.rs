use std::path::Path;

use nako_core::{Token, TokenRole};

use super::load_or_exit;
use crate::config::Settings;
use crate::OutputFormat;

pub(crate) fn cmd_tokens(file: &Path, settings: Settings, output: OutputFormat, quiet: bool) {
    let (loader, uri) = load_or_exit(file, settings, output, quiet);
    let Some(doc) = loader.project.get(&uri) else {
        return;
    };
    if quiet {
        return;
    }
    match output {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(doc.tokens())
                .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e));
            println!("{}", json);
        }
        OutputFormat::Text => {
            for tok in doc.tokens() {
                println!("{}", describe(tok));
            }
        }
    }
}

/// One line per token: position, kinds, text and attachments.
fn describe(tok: &Token) -> String {
    let mut line = format!("{}\t{:?}", tok.span.start, tok.kind);
    if tok.fix != tok.kind {
        line.push_str(&format!("/{:?}", tok.fix));
    }
    line.push_str(&format!("\t{:?}", tok.text));
    if let Some(unit) = &tok.unit {
        line.push_str(&format!("\tunit={}", unit.value));
    }
    if let Some(josi) = tok.josi() {
        line.push_str(&format!("\tjosi={}", josi));
    }
    match &tok.role {
        TokenRole::Plain => {}
        TokenRole::LinkMain(id) => line.push_str(&format!("\tblock={}", id.0)),
        TokenRole::LinkRef { main } => line.push_str(&format!("\tclause-of={}", main)),
        TokenRole::Reference { access, .. } => line.push_str(&format!("\t{:?}", access)),
        TokenRole::Call { args, .. } => line.push_str(&format!("\tcall args={}", args.len())),
    }
    line
}
