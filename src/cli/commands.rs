use std::path::{Path, PathBuf};

use log::info;
use petgraph::stable_graph::NodeIndex;

use crate::config::{ExchangeSettings, SettingsFile};
use crate::error::{Result, TagCsvError};
use crate::exchange::{ExportStats, Exchange, ImportStats};
use crate::tree::{NodeKind, ProjectTree, TagStore};

use super::theme;
use super::{Cli, Commands, SettingsArgs};

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Export { project, settings } => cmd_export(&project.project, &settings),
        Commands::Import {
            project,
            settings,
            project_name,
        } => cmd_import(&project.project, &settings, project_name.as_deref()),
        Commands::Show { project } => cmd_show(&project.project),
    }
}

/// Merge the settings file with command-line overrides and validate.
fn load_settings(project_path: &Path, args: &SettingsArgs) -> Result<ExchangeSettings> {
    let settings = SettingsFile::discover(args.config.as_deref())?.merge(args.overrides());
    settings.resolve(&project_dir(project_path))
}

fn project_dir(project_path: &Path) -> PathBuf {
    match project_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn cmd_export(project_path: &Path, args: &SettingsArgs) -> Result<()> {
    let settings = load_settings(project_path, args)?;
    let tree = ProjectTree::load(project_path)?;

    let mut exchange = Exchange::new(tree);
    exchange.start_export(&settings)?;
    let stats = exchange
        .wait_export()
        .ok_or_else(|| TagCsvError::TaskPanicked("export was not started".to_string()))??;

    print_export_summary(&stats, &settings.csv_path);
    Ok(())
}

fn cmd_import(project_path: &Path, args: &SettingsArgs, project_name: Option<&str>) -> Result<()> {
    let settings = load_settings(project_path, args)?;
    let tree = if project_path.exists() {
        ProjectTree::load(project_path)?
    } else {
        let name = project_name.ok_or_else(|| {
            TagCsvError::Config(format!(
                "Project file {} does not exist; pass --project-name to create it",
                project_path.display()
            ))
        })?;
        info!("Creating new project \"{}\"", name);
        ProjectTree::new(name)
    };

    let mut exchange = Exchange::new(tree);
    exchange.start_import(&settings)?;
    let stats = exchange
        .wait_import()
        .ok_or_else(|| TagCsvError::TaskPanicked("import was not started".to_string()))??;

    if stats.cancelled {
        println!("{}", theme::warning("Import cancelled; project file left unchanged."));
        return Ok(());
    }

    let tree = exchange.tree();
    let tree = tree.lock().map_err(|_| TagCsvError::LockPoisoned)?;
    tree.save(project_path)?;
    print_import_summary(&stats, project_path);
    Ok(())
}

fn cmd_show(project_path: &Path) -> Result<()> {
    let tree = ProjectTree::load(project_path)?;
    for line in render_tree(&tree) {
        println!("{}", line);
    }
    Ok(())
}

fn print_export_summary(stats: &ExportStats, csv_path: &Path) {
    if stats.cancelled {
        println!("{}", theme::warning("Export cancelled; nothing was written."));
        return;
    }
    println!(
        "{} {} tag(s) to {}",
        theme::success("Exported"),
        stats.exported,
        csv_path.display()
    );
    if stats.filtered > 0 {
        println!(
            "  {}",
            theme::warning(&format!(
                "{} node(s) contain the field separator and were left out (enable --wrap-fields)",
                stats.filtered
            ))
        );
    }
    if stats.skipped > 0 {
        println!(
            "  {}",
            theme::warning(&format!("{} tag(s) have an unsupported data type", stats.skipped))
        );
    }
}

fn print_import_summary(stats: &ImportStats, project_path: &Path) {
    println!(
        "{} {} tag(s) into {}",
        theme::success("Imported"),
        stats.imported,
        project_path.display()
    );
    println!(
        "  {}",
        theme::dim(&format!(
            "{} folder(s) and {} structure(s) created",
            stats.folders_created, stats.groups_created
        ))
    );
    if stats.rows_failed > 0 {
        println!(
            "  {}",
            theme::error(&format!("{} row(s) could not be imported", stats.rows_failed))
        );
    }
}

/// One line per node, indented by depth, starting with the project name.
pub fn render_tree(tree: &ProjectTree) -> Vec<String> {
    let mut lines = vec![theme::header(tree.project_name())];
    render_children(tree, tree.root(), "", &mut lines);
    lines
}

fn render_children(tree: &ProjectTree, idx: NodeIndex, prefix: &str, lines: &mut Vec<String>) {
    let children = tree.child_indices(idx);
    let last = children.len().saturating_sub(1);
    for (i, child) in children.into_iter().enumerate() {
        let Some(node) = tree.get_node(child) else {
            continue;
        };
        let (branch, indent) = if i == last {
            ("└── ", "    ")
        } else {
            ("├── ", "│   ")
        };
        lines.push(format!(
            "{}{}{} {}",
            theme::dim(prefix),
            theme::dim(branch),
            node.name,
            describe(&node.kind)
        ));
        render_children(tree, child, &format!("{}{}", prefix, indent), lines);
    }
}

fn describe(kind: &NodeKind) -> String {
    match kind {
        NodeKind::Tag(spec) => {
            let mut text = spec.data_type.clone();
            if spec.array_elements() > 0 {
                text.push_str(&format!("[{}]", spec.array_elements()));
            }
            if !spec.symbol_name.is_empty() {
                text.push_str(&format!(" @{}", spec.symbol_name));
            }
            theme::meta(&text)
        }
        other => theme::label(&format!("({})", other.label())),
    }
}
