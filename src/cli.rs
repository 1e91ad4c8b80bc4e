use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "asset-relocator")]
#[command(about = "Move, rename and delete source assets without breaking references", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Move or rename source files. Wildcards (*) are allowed in both paths.
    Move {
        source: String,
        destination: String,
        #[command(flatten)]
        options: RelocationArgs,
    },
    /// Delete source files. Wildcards (*) are allowed.
    Delete {
        source: String,
        #[command(flatten)]
        options: RelocationArgs,
    },
    /// Scan the configured scan folders and report what was found
    Scan,
    /// Print configuration values
    PrintConfig,
}

#[derive(Debug, Args)]
pub struct RelocationArgs {
    /// Perform the operation. Without this only a preview report is printed.
    #[arg(long)]
    pub confirm: bool,
    /// Keep folders left empty by the operation
    #[arg(long)]
    pub leave_empty_folders: bool,
    /// Rewrite references held by dependent files (move only)
    #[arg(long)]
    pub update_references: bool,
    /// Proceed even though dependent files will be left with broken references
    #[arg(long)]
    pub allow_broken_dependencies: bool,
    /// Leave companion metadata files alone
    #[arg(long)]
    pub exclude_metadata_files: bool,
    /// Also operate on files the asset database does not know about
    #[arg(long)]
    pub allow_non_database_files: bool,
    /// Write the affected files to a CSV file
    #[arg(long, value_name = "PATH")]
    pub csv: Option<String>,
}
