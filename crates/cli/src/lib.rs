pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "factotum",
    about = "Factotum operator CLI",
    long_about = "Set up the fact store, ingest documents into the vector index, \
                  and chat with the agent over the running tool services.",
    after_help = "Examples:\n  factotum setup-db\n  factotum ingest report.txt\n  factotum chat --planner crew\n  factotum doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(name = "setup-db", about = "Create, migrate, and seed the company fact store")]
    SetupDb,
    #[command(about = "Chunk, embed, and index a document for the document_search tool")]
    Ingest {
        #[arg(help = "Path to a UTF-8 text document")]
        file: PathBuf,
        #[arg(long, help = "Source name stored with the chunks (defaults to the file name)")]
        source: Option<String>,
    },
    #[command(about = "Interactive question-answering session against the tool services")]
    Chat {
        #[arg(long, help = "Planner to use: sequential or crew (overrides config)")]
        planner: Option<String>,
    },
    #[command(about = "Inspect effective configuration values with secrets redacted")]
    Config,
    #[command(about = "Validate config, credential, fact store, index, and tool reachability")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::SetupDb => commands::setup::run(),
        Command::Ingest { file, source } => commands::ingest::run(&file, source.as_deref()),
        Command::Chat { planner } => commands::chat::run(planner.as_deref()),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
