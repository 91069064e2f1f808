use std::path::Path;

use nako_core::declare::Tier;
use nako_core::{Declare, DeclareKind};

use super::load_or_exit;
use crate::config::Settings;
use crate::OutputFormat;

pub(crate) fn cmd_decls(file: &Path, settings: Settings, output: OutputFormat, quiet: bool) {
    let (loader, uri) = load_or_exit(file, settings, output, quiet);
    let Some(doc) = loader.project.get(&uri) else {
        return;
    };
    if quiet {
        return;
    }
    let table = doc.declarations();
    match output {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(table)
                .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e));
            println!("{}", json);
        }
        OutputFormat::Text => {
            for import in &table.imports {
                println!("import\t{}", import.path);
            }
            for (_, decl) in table.iter() {
                println!("{}", describe(decl));
            }
        }
    }
}

fn describe(decl: &Declare) -> String {
    let kind = match &decl.kind {
        DeclareKind::Func(info) => {
            let args: Vec<String> = info
                .args
                .iter()
                .map(|a| format!("{}{}", a.varname, a.josi.join("|")))
                .collect();
            format!("func({})", args.join(" "))
        }
        DeclareKind::Var => "var".to_owned(),
        DeclareKind::Const => "const".to_owned(),
        DeclareKind::Param => "parameter".to_owned(),
    };
    let tier = match &decl.tier {
        Tier::Global { visibility, .. } => format!("global/{:?}", visibility).to_lowercase(),
        Tier::Local { scope } => format!("scope {}", scope.0),
    };
    let line = decl
        .range
        .map_or_else(|| "-".to_owned(), |r| (r.start.line + 1).to_string());
    format!("{}\t{}\t{}\t{}", line, decl.name, kind, tier)
}
