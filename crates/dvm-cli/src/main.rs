use clap::{Parser, Subcommand};
use dvm::commands::{
    apply,
    config::{self, ConfigAction},
    delete,
    generate::{self, GenerateCommand},
    get::{self, GetCommand, OutputFormat},
};
use dvm::common::parse_kind;
use dvm::{CliError, GlobalOpts};
use dvm_manifest::ResourceKind;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "dvm")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "Editor and shell configuration as manifests",
    long_about = "dvm stores Neovim plugins, themes and packages and zsh plugins and profiles as declarative manifests, and generates the files their tools load."
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOpts,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or update resources from a manifest file
    Apply {
        /// Manifest file, or `-` for stdin
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Print a resource's manifest, or list the resources of a kind
    Get {
        #[arg(value_parser = parse_kind)]
        kind: ResourceKind,
        name: Option<String>,
        /// Output format
        #[arg(short, long, value_enum)]
        output: Option<OutputFormat>,
        /// Write the manifests to a file instead of stdout
        #[arg(long, conflicts_with = "output")]
        file: Option<PathBuf>,
        /// Fail on malformed stored attributes instead of omitting them
        #[arg(long)]
        strict: bool,
    },
    /// Generate config files for resources
    Generate {
        #[arg(value_parser = parse_kind)]
        kind: ResourceKind,
        #[arg(required_unless_present = "all")]
        names: Vec<String>,
        /// Generate every resource of the kind
        #[arg(long, conflicts_with = "names")]
        all: bool,
        /// Output root (default: configured output-dir)
        #[arg(long)]
        out: Option<PathBuf>,
        /// Keep generating remaining files after one fails
        #[arg(long)]
        keep_going: bool,
        /// Fail on malformed stored attributes instead of omitting them
        #[arg(long)]
        strict: bool,
    },
    /// Delete a resource
    Delete {
        #[arg(value_parser = parse_kind)]
        kind: ResourceKind,
        name: String,
    },
    /// Configure dvm
    #[command(subcommand_required = true, arg_required_else_help = true)]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| dvm_logger::verbosity_to_filter().into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(std::io::stderr),
        )
        .try_init();
}

fn run(command: Commands, global: &GlobalOpts) -> Result<(), CliError> {
    match command {
        Commands::Apply { file } => apply::handle_apply(&file, global),
        Commands::Get {
            kind,
            name,
            output,
            file,
            strict,
        } => get::handle_get(
            GetCommand {
                kind,
                name,
                output,
                file,
                strict,
            },
            global,
        ),
        Commands::Generate {
            kind,
            names,
            all,
            out,
            keep_going,
            strict,
        } => generate::handle_generate(
            GenerateCommand {
                kind,
                names,
                all,
                out,
                keep_going,
                strict,
            },
            global,
        ),
        Commands::Delete { kind, name } => delete::handle_delete(kind, &name, global),
        Commands::Config { action } => config::handle_config(action, global),
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = dvm_logger::init_with_verbosity(cli.global.verbosity_level(), cli.global.quiet) {
        eprintln!("Warning: Failed to initialize logger: {}", e);
    }
    init_tracing();

    if let Err(e) = run(cli.command, &cli.global) {
        dvm_logger::spinner_stop();
        dvm_logger::error(&e.to_string());
        std::process::exit(1);
    }
}
