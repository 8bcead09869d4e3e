pub mod commands;
pub mod theme;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::SettingsFile;

pub use commands::run;

#[derive(Parser, Debug)]
#[command(name = "tagcsv")]
#[command(about = "Export and import device tag definitions as CSV", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write every tag below the driver reference to the CSV file
    Export {
        #[command(flatten)]
        project: ProjectArgs,
        #[command(flatten)]
        settings: SettingsArgs,
    },
    /// Read tags from the CSV file into the project
    Import {
        #[command(flatten)]
        project: ProjectArgs,
        #[command(flatten)]
        settings: SettingsArgs,
        /// Name of the project to create when the project file does not exist
        #[arg(long)]
        project_name: Option<String>,
    },
    /// Print the project tree
    Show {
        #[command(flatten)]
        project: ProjectArgs,
    },
}

#[derive(Args, Debug, Clone)]
pub struct ProjectArgs {
    /// Project file (JSON)
    #[arg(short, long)]
    pub project: PathBuf,
}

#[derive(Args, Debug, Clone, Default)]
pub struct SettingsArgs {
    /// Settings file; defaults to settings.json in the config directory
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Path of the node whose tags are exported
    #[arg(short, long)]
    pub driver: Option<String>,
    /// CSV file location (plain path, file:// URI or %PROJECTDIR%/...)
    #[arg(short, long)]
    pub csv: Option<String>,
    /// Single-character field separator
    #[arg(short, long)]
    pub separator: Option<String>,
    /// Quote every field when writing
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub wrap_fields: Option<bool>,
}

impl SettingsArgs {
    /// Flags given on the command line, as settings overrides.
    pub fn overrides(&self) -> SettingsFile {
        SettingsFile {
            driver_reference: self.driver.clone(),
            csv_path: self.csv.clone(),
            field_separator: self.separator.clone(),
            wrap_fields: self.wrap_fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_export() {
        let cli = Cli::try_parse_from([
            "tagcsv", "export", "-p", "plant.json", "--driver", "Plant/D", "--csv", "out.csv",
            "--separator", ";", "--wrap-fields",
        ])
        .unwrap();
        let Commands::Export { project, settings } = cli.command else {
            panic!("expected export");
        };
        assert_eq!(project.project, PathBuf::from("plant.json"));
        let overrides = settings.overrides();
        assert_eq!(overrides.driver_reference.as_deref(), Some("Plant/D"));
        assert_eq!(overrides.csv_path.as_deref(), Some("out.csv"));
        assert_eq!(overrides.field_separator.as_deref(), Some(";"));
        assert_eq!(overrides.wrap_fields, Some(true));
    }

    #[test]
    fn test_parse_import_wrap_false() {
        let cli = Cli::try_parse_from([
            "tagcsv",
            "import",
            "--project",
            "plant.json",
            "--wrap-fields",
            "false",
            "--project-name",
            "Plant",
        ])
        .unwrap();
        let Commands::Import {
            settings,
            project_name,
            ..
        } = cli.command
        else {
            panic!("expected import");
        };
        assert_eq!(settings.wrap_fields, Some(false));
        assert_eq!(project_name.as_deref(), Some("Plant"));
        assert!(settings.config.is_none());
    }

    #[test]
    fn test_parse_requires_project() {
        assert!(Cli::try_parse_from(["tagcsv", "show"]).is_err());
    }
}
