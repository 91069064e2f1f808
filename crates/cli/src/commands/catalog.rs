use std::path::Path;
use std::process;

use nako_core::plugin::{export_table, parse_export, system_export, validate_export, PluginExport};

use super::load_or_exit;
use crate::config::Settings;
use crate::{report_error, OutputFormat};

pub(crate) fn cmd_validate(file: &Path, output: OutputFormat, quiet: bool) {
    let text = match std::fs::read_to_string(file) {
        Ok(s) => s,
        Err(e) => {
            let msg = format!("error reading file '{}': {}", file.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };
    let export = match parse_export(&text) {
        Ok(export) => export,
        Err(e) => {
            report_error(&format!("{}: {}", file.display(), e), output, quiet);
            process::exit(1);
        }
    };

    let problems = validate_export(&export);
    if !quiet {
        match output {
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "valid": problems.is_empty(),
                    "plugins": export.len(),
                    "problems": problems.iter().map(ToString::to_string).collect::<Vec<_>>(),
                });
                println!("{}", json);
            }
            OutputFormat::Text => {
                for problem in &problems {
                    println!("{}: {}", file.display(), problem);
                }
                if problems.is_empty() {
                    println!("{}: {} plugin(s), valid", file.display(), export.len());
                }
            }
        }
    }
    if !problems.is_empty() {
        process::exit(1);
    }
}

/// Exports are JSON in either output mode.
pub(crate) fn cmd_export(file: &Path, settings: Settings, output: OutputFormat, quiet: bool) {
    let (loader, uri) = load_or_exit(file, settings, output, quiet);
    let Some(doc) = loader.project.get(&uri) else {
        return;
    };
    print_export(&export_table(doc.declarations()));
}

pub(crate) fn cmd_system() {
    print_export(&system_export());
}

fn print_export(export: &PluginExport) {
    let json = serde_json::to_string_pretty(export)
        .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e));
    println!("{}", json);
}
