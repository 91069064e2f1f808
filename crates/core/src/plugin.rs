//! Plugin declaration catalog.
//!
//! The export format is a nested JSON mapping
//! `plugin → group → command → {type, args?, hint?, flags}`. It is loaded into
//! a [`DeclarationTable`] the resolver consults last, and any file's public
//! declarations can be written back out in the same shape.

use crate::declare::{
    Declare, DeclarationTable, DeclareKind, FuncInfo, FunctionArg, Origin, Tier, Visibility,
};
use crate::error::NakoError;
use crate::kana::{normalize, trim_okurigana};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Plugin name of the built-in commands; they get [`Origin::System`].
pub const SYSTEM_PLUGIN: &str = "system";

/// `(plugin, group)` pairs that may legitimately have no commands.
pub const EMPTY_GROUP_ALLOW_LIST: &[(&str, &str)] =
    &[("system", "予約語"), ("plugin_browser", "ブラウザ部品")];

pub type PluginExport = BTreeMap<String, BTreeMap<String, BTreeMap<String, CommandSpec>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandKind {
    Func,
    Var,
    Const,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandArg {
    pub name: String,
    #[serde(default)]
    pub josi: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandFlags {
    #[serde(default)]
    pub pure: bool,
    #[serde(rename = "async", default)]
    pub is_async: bool,
    #[serde(default)]
    pub variadic: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    #[serde(rename = "type")]
    pub kind: CommandKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<CommandArg>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(default)]
    pub flags: CommandFlags,
}

/// A structural defect in an export.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogProblem {
    #[error("plugin '{plugin}' has no command group")]
    EmptyPlugin { plugin: String },
    #[error("group '{group}' of plugin '{plugin}' has no command")]
    EmptyGroup { plugin: String, group: String },
}

pub fn parse_export(json: &str) -> Result<PluginExport, NakoError> {
    Ok(serde_json::from_str(json)?)
}

/// Every plugin needs a group and every group a command, except the
/// allow-listed groups.
pub fn validate_export(export: &PluginExport) -> Vec<CatalogProblem> {
    let mut problems = Vec::new();
    for (plugin, groups) in export {
        if groups.is_empty() {
            problems.push(CatalogProblem::EmptyPlugin {
                plugin: plugin.clone(),
            });
        }
        for (group, commands) in groups {
            let allowed = EMPTY_GROUP_ALLOW_LIST
                .iter()
                .any(|(p, g)| p == plugin && g == group);
            if commands.is_empty() && !allowed {
                problems.push(CatalogProblem::EmptyGroup {
                    plugin: plugin.clone(),
                    group: group.clone(),
                });
            }
        }
    }
    problems
}

/// Load an export into a table. The first command of a given normalized name
/// wins.
pub fn catalog_table(export: &PluginExport) -> DeclarationTable {
    let mut table = DeclarationTable::new("catalog", "catalog");
    for (plugin, groups) in export {
        let origin = if plugin == SYSTEM_PLUGIN {
            Origin::System
        } else {
            Origin::Plugin
        };
        for commands in groups.values() {
            for (name, spec) in commands {
                let decl = Declare {
                    name: name.clone(),
                    name_normalized: normalize(&trim_okurigana(name)),
                    range: None,
                    origin,
                    active_from: 0,
                    tier: Tier::Global {
                        module: plugin.clone(),
                        source: plugin.clone(),
                        visibility: Visibility::Public,
                        remote: false,
                    },
                    kind: spec.declare_kind(),
                };
                if table.insert(decl).is_err() {
                    tracing::trace!(plugin = %plugin, command = %name, "duplicate catalog command");
                }
            }
        }
    }
    tracing::debug!(commands = table.len(), "catalog loaded");
    table
}

/// Public globals of `table` in export form, grouped by declaration kind.
pub fn export_table(table: &DeclarationTable) -> PluginExport {
    let mut groups: BTreeMap<String, BTreeMap<String, CommandSpec>> = BTreeMap::new();
    for (_, decl) in table.globals().filter(|(_, d)| d.is_public()) {
        let (group, spec) = match &decl.kind {
            DeclareKind::Func(info) => ("関数", CommandSpec::from_func(info)),
            DeclareKind::Const => ("定数", CommandSpec::value(CommandKind::Const)),
            _ => ("変数", CommandSpec::value(CommandKind::Var)),
        };
        groups
            .entry(group.to_owned())
            .or_default()
            .insert(decl.name.clone(), spec);
    }
    let mut export = PluginExport::new();
    export.insert(table.module.clone(), groups);
    export
}

impl CommandSpec {
    fn value(kind: CommandKind) -> Self {
        CommandSpec {
            kind,
            args: None,
            hint: None,
            flags: CommandFlags::default(),
        }
    }

    fn from_func(info: &FuncInfo) -> Self {
        let args = info
            .args
            .iter()
            .map(|a| CommandArg {
                name: a.varname.clone(),
                josi: a.josi.clone(),
            })
            .collect();
        CommandSpec {
            kind: CommandKind::Func,
            args: Some(args),
            hint: None,
            flags: CommandFlags {
                pure: info.pure,
                is_async: info.is_async,
                variadic: info.variadic,
            },
        }
    }

    fn declare_kind(&self) -> DeclareKind {
        match self.kind {
            CommandKind::Var => DeclareKind::Var,
            CommandKind::Const => DeclareKind::Const,
            CommandKind::Func => DeclareKind::Func(FuncInfo {
                args: self
                    .args
                    .iter()
                    .flatten()
                    .map(|a| FunctionArg {
                        varname: a.name.clone(),
                        attr: Vec::new(),
                        josi: a.josi.clone(),
                        range: None,
                    })
                    .collect(),
                pure: self.flags.pure,
                is_async: self.flags.is_async,
                variadic: self.flags.variadic,
            }),
        }
    }
}

// ──────────────────────────────────────────────
// Built-in commands
// ──────────────────────────────────────────────

fn func(args: &[(&str, &[&str])], hint: &str) -> CommandSpec {
    CommandSpec {
        kind: CommandKind::Func,
        args: Some(
            args.iter()
                .map(|(name, josi)| CommandArg {
                    name: (*name).to_owned(),
                    josi: josi.iter().map(|j| (*j).to_owned()).collect(),
                })
                .collect(),
        ),
        hint: Some(hint.to_owned()),
        flags: CommandFlags {
            pure: true,
            ..CommandFlags::default()
        },
    }
}

/// The commands every program can use without an import.
pub fn system_export() -> PluginExport {
    let mut basic = BTreeMap::new();
    let mut show = func(&[("S", &["を", "と"])], "Sを表示");
    show.flags.pure = false;
    basic.insert("表示".to_owned(), show);
    let mut quit = func(&[], "終わる");
    quit.flags.pure = false;
    basic.insert("終わる".to_owned(), quit);
    basic.insert("それ".to_owned(), CommandSpec::value(CommandKind::Var));
    basic.insert("対象".to_owned(), CommandSpec::value(CommandKind::Var));
    basic.insert("はい".to_owned(), CommandSpec::value(CommandKind::Const));
    basic.insert("いいえ".to_owned(), CommandSpec::value(CommandKind::Const));
    basic.insert("改行".to_owned(), CommandSpec::value(CommandKind::Const));
    basic.insert("空".to_owned(), CommandSpec::value(CommandKind::Const));

    let mut arith = BTreeMap::new();
    arith.insert("足す".to_owned(), func(&[("A", &["と", "に"]), ("B", &["を"])], "AとBを足す"));
    arith.insert("引く".to_owned(), func(&[("A", &["から"]), ("B", &["を"])], "AからBを引く"));
    arith.insert("掛ける".to_owned(), func(&[("A", &["に", "と"]), ("B", &["を"])], "AにBを掛ける"));
    arith.insert("割る".to_owned(), func(&[("A", &["を"]), ("B", &["で"])], "AをBで割る"));
    let mut sum = func(&[("A", &["と"]), ("B", &["を"])], "AとBを連続加算");
    sum.flags.variadic = true;
    arith.insert("連続加算".to_owned(), sum);
    arith.insert("PI".to_owned(), CommandSpec::value(CommandKind::Const));

    let mut text = BTreeMap::new();
    text.insert("文字数".to_owned(), func(&[("S", &["の"])], "Sの文字数"));
    text.insert(
        "置換".to_owned(),
        func(&[("S", &["の"]), ("A", &["を"]), ("B", &["に", "へ"])], "SのAをBに置換"),
    );
    text.insert("文字列変換".to_owned(), func(&[("S", &["を"])], "Sを文字列変換"));
    text.insert("配列要素数".to_owned(), func(&[("A", &["の"])], "Aの配列要素数"));

    let mut groups = BTreeMap::new();
    groups.insert("基本命令".to_owned(), basic);
    groups.insert("四則演算".to_owned(), arith);
    groups.insert("文字列処理".to_owned(), text);
    groups.insert("予約語".to_owned(), BTreeMap::new());

    let mut export = PluginExport::new();
    export.insert(SYSTEM_PLUGIN.to_owned(), groups);
    export
}

pub fn system_catalog() -> DeclarationTable {
    catalog_table(&system_export())
}
