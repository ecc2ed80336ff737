use clap::{Parser, Subcommand};
use sheetbase::cli;
use sheetbase::config::{ServiceConfig, TOKEN_ENV_VAR};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "sheetbase")]
#[command(about = "Hosted spreadsheets as a small database: build, populate, extract.")]
#[command(long_about = "Sheetbase - hosted spreadsheets as a small relational store

COMMANDS:
  build       - Create a spreadsheet from a YAML definition
  populate    - Write CSV seed data and formulas into a spreadsheet
  extract     - Export every formula of a configured system to CSV
  dump        - Write formulas and displayed values side by side
  sheets      - List the sheets of a configured system
  delete-file - Delete a spreadsheet file

EXAMPLES:
  sheetbase build investors.yaml --dry-run      # Show the mutation plan
  sheetbase populate 1AbC... populate.yaml      # Seed an existing spreadsheet
  sheetbase extract bms                         # formula_exports/bms/formulas_<ts>.csv

AUTHENTICATION:
  Pass an OAuth access token with --token or SHEETBASE_ACCESS_TOKEN.
  Acquiring and refreshing the token is left to the caller.")]
#[command(version)]
struct Cli {
    /// OAuth bearer token for the Sheets and Drive APIs
    #[arg(long, global = true, env = TOKEN_ENV_VAR, hide_env_values = true)]
    token: Option<String>,

    /// Systems configuration file (YAML or JSON)
    #[arg(short, long, global = true, default_value = "sheetbase.yaml")]
    config: PathBuf,

    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(long_about = "Create a spreadsheet from a YAML definition.

The definition is checked against the bundled JSON Schema and every sheet,
color and validation rule is validated before anything is created.

DEFINITION FORMAT:
  title: Investors DB
  sheets:
    - name: \"[DB] Investors\"
      color: \"#cfe2f3\"
      headers: [Investor_ID, Full_Name, Email]
  validations:
    - sheet: \"[LOGIC] Status\"
      column: A
      source: \"='[DB] Investors'!A2:A\"

Use --dry-run to print the mutation plan without a token.")]
    /// Create a spreadsheet from a YAML definition
    Build {
        /// Path to the definition file
        file: PathBuf,

        /// Build against an in-memory spreadsheet and print the plan
        #[arg(short = 'n', long)]
        dry_run: bool,
    },

    /// Write CSV seed data and formulas into an existing spreadsheet
    Populate {
        /// Spreadsheet id
        spreadsheet_id: String,

        /// Path to the populate file
        file: PathBuf,
    },

    #[command(long_about = "Export every formula of a configured system to CSV.

Sheets are chosen by the system's selection settings: the template sheet
(tagged ' (TEMPLATE)' in the export), then the explicit sheet list, and only
when no template was found, every sheet whose name matches the pattern.

The export lands in <export_dir>/<system>/formulas_<YYYY-MM-DD_HH-MM-SS>.csv.")]
    /// Export every formula of a configured system to CSV
    Extract {
        /// System name from the config file
        system: String,
    },

    /// Write formulas and displayed values of every sheet to a text file
    Dump {
        /// System name from the config file
        system: String,

        /// Output file
        out: PathBuf,
    },

    /// List the sheets of a configured system
    Sheets {
        /// System name from the config file
        system: String,
    },

    /// Delete a spreadsheet file (missing files are reported, not an error)
    DeleteFile {
        /// Drive file id
        file_id: String,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sheetbase=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let service_config = ServiceConfig {
        access_token: cli.token,
        timeout: cli.timeout.map(Duration::from_secs),
        ..ServiceConfig::default()
    };

    let result = match cli.command {
        Commands::Build { file, dry_run } => cli::build(file, dry_run, &service_config),
        Commands::Populate {
            spreadsheet_id,
            file,
        } => cli::populate(spreadsheet_id, file, &service_config),
        Commands::Extract { system } => cli::extract(system, &cli.config, &service_config),
        Commands::Dump { system, out } => cli::dump(system, out, &cli.config, &service_config),
        Commands::Sheets { system } => cli::sheets(system, &cli.config, &service_config),
        Commands::DeleteFile { file_id } => cli::delete_file(file_id, &service_config),
    };
    if let Some(hint) = result.as_ref().err().and_then(cli::failure_hint) {
        eprintln!("hint: {}", hint);
    }
    Ok(result?)
}
