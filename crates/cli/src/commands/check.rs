use std::path::PathBuf;
use std::process;

use nako_core::{ErrorInfo, ErrorLevel};
use serde::Serialize;

use super::Loader;
use crate::config::Settings;
use crate::{report_error, OutputFormat};

#[derive(Serialize)]
struct FileReport {
    file: String,
    diagnostics: Vec<ErrorInfo>,
    /// Diagnostics discarded by the problems limit.
    dropped: usize,
    /// Imported files that were loaded.
    imports: usize,
    /// False when some import could not be loaded.
    imports_complete: bool,
}

pub(crate) fn cmd_check(files: &[PathBuf], settings: Settings, output: OutputFormat, quiet: bool) {
    let mut loader = Loader::new(settings, output, quiet);
    let mut reports = Vec::new();
    let mut failed = false;

    for file in files {
        let Some((uri, load)) = loader.load(file) else {
            report_error(&format!("error reading file '{}'", file.display()), output, quiet);
            failed = true;
            continue;
        };
        let Some(doc) = loader.project.get(&uri) else {
            continue;
        };
        let diagnostics = doc.diagnostics().to_vec();
        if diagnostics.iter().any(|d| d.level == ErrorLevel::Error) {
            failed = true;
        }
        reports.push(FileReport {
            file: file.display().to_string(),
            dropped: doc.analysis().map_or(0, |a| a.dropped),
            diagnostics,
            imports: load.visited.len().saturating_sub(1),
            imports_complete: load.complete,
        });
    }

    if !quiet {
        match output {
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(&reports)
                    .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e));
                println!("{}", json);
            }
            OutputFormat::Text => print_text(&reports),
        }
    }

    if failed {
        process::exit(1);
    }
}

fn print_text(reports: &[FileReport]) {
    let mut total = 0;
    for report in reports {
        for d in &report.diagnostics {
            println!(
                "{}:{}: {} [{}] {}",
                report.file,
                d.span.start,
                d.level,
                d.message_id,
                d.message()
            );
        }
        if report.dropped > 0 {
            println!("{}: {} more problem(s) not shown", report.file, report.dropped);
        }
        if !report.imports_complete {
            println!("{}: some imports could not be loaded", report.file);
        }
        total += report.diagnostics.len() + report.dropped;
    }
    println!("{} problem(s) in {} file(s)", total, reports.len());
}
