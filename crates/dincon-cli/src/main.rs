//! dincon: plan tasks with a language model and manage the resulting changes
//!
//! Every invocation runs one command and exits.

mod commands;
mod console;
mod exit_codes;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use dincon_core::{ChatClient, ConfigStore, DinconError, Git, Project};
use std::path::PathBuf;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use crate::commands::Context;
use crate::console::Terminal;

const RED: &str = "\x1b[91m";
const RESET: &str = "\x1b[0m";

#[derive(Debug, Parser)]
#[command(name = "dincon")]
#[command(about = "Break tasks into steps with an LLM and manage the resulting git changes", version)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Directory holding config.json, token.txt and settings.toml
    #[arg(long, global = true, env = "DINCON_HOME")]
    config_dir: Option<PathBuf>,

    /// Project directory (default: current directory)
    #[arg(long, global = true, env = "DINCON_PROJECT_DIR")]
    project_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Setup user information
    Setup {
        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        name: Option<String>,
    },

    /// Login and store token
    Login {
        /// Token to store (skips the browser and prompt)
        #[arg(long)]
        token: Option<String>,

        /// Print the login URL instead of opening a browser
        #[arg(long)]
        no_browser: bool,
    },

    /// Logout and remove stored token
    Logout,

    /// Show the configured user and session
    Whoami,

    /// Initialize a .dincon project
    Init {
        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        description: Option<String>,
    },

    /// Break down a high-level task into atomic actionable steps
    Plan {
        /// Task description
        task: Vec<String>,
    },

    /// Show the saved plan
    Show,

    /// Ask the model how to implement one step of the plan
    Execute {
        /// Step number to execute
        #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
        step: i64,
    },

    /// Stage and commit all changes
    Commit {
        /// Commit message (prompted if omitted)
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Revert uncommitted changes
    Abort {
        /// Revert without asking for confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    load_dotenv();

    let code = match run(cli) {
        Ok(()) => exit_codes::OK,
        Err(err) => {
            report(&err);
            exit_codes::for_error(&err)
        }
    };
    std::process::exit(code);
}

/// `RUST_LOG` wins; otherwise warn, or debug with --verbose. Logs go to stderr.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Load `.env` from the working directory. A missing file is fine.
fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => debug!(path = %path.display(), "Loaded environment"),
        Err(dotenvy::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(error = %e, "Failed to load .env"),
    }
}

fn report(err: &anyhow::Error) {
    match err.downcast_ref::<DinconError>() {
        Some(e) if e.is_user_facing() => eprintln!("{e}"),
        _ => eprintln!("{RED}Error:{RESET} {err:#}"),
    }
}

fn build_context(cli: &Cli) -> Result<Context> {
    let store = match &cli.config_dir {
        Some(dir) => ConfigStore::new(dir),
        None => ConfigStore::default_location()?,
    };

    let project_root = match &cli.project_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("Failed to determine current directory")?,
    };
    debug!(
        config_dir = %store.dir().display(),
        project = %project_root.display(),
        "Resolved directories"
    );

    Ok(Context {
        store,
        project: Project::new(&project_root),
        git: Git::new(&project_root),
    })
}

fn run(cli: Cli) -> Result<()> {
    let ctx = build_context(&cli)?;
    let mut console = Terminal::stdio();

    match cli.command {
        Commands::Setup { email, name } => commands::setup(&ctx, &mut console, email, name),
        Commands::Login { token, no_browser } => {
            commands::login(&ctx, &mut console, token, !no_browser)
        }
        Commands::Logout => commands::logout(&ctx, &mut console),
        Commands::Whoami => commands::whoami(&ctx, &mut console),
        Commands::Init { title, description } => {
            commands::init(&ctx, &mut console, title, description)
        }
        Commands::Plan { task } => {
            let chat = ChatClient::from_settings(&ctx.settings()?.llm)?;
            commands::plan(&ctx, &mut console, &chat, task)
        }
        Commands::Show => commands::show(&ctx, &mut console),
        Commands::Execute { step } => {
            commands::execute(&ctx, &mut console, step, |ctx| {
                ChatClient::from_settings(&ctx.settings()?.llm)
            })
        }
        Commands::Commit { message } => commands::commit(&ctx, &mut console, message),
        Commands::Abort { yes } => commands::abort(&ctx, &mut console, yes),
    }
}
