use std::error::Error;

use clap::{CommandFactory, Parser, Subcommand};
use resumatch_core::CoreError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod context;

use context::Context;

/// Environment variable holding a `tracing` filter directive.
const LOG_ENV: &str = "RESUMATCH_LOG";

#[derive(Parser)]
#[command(name = "resumatch", version, about = "Resumatch CLI")]
struct Cli {
    /// Log requests and session changes to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in, sign up, reset a password
    Auth {
        #[command(subcommand)]
        action: commands::auth::AuthAction,
    },
    /// View and edit your profile
    Profile {
        #[command(subcommand)]
        action: commands::profile::ProfileAction,
    },
    /// Account security: email, password, sessions
    Account {
        #[command(subcommand)]
        action: commands::account::AccountAction,
    },
    /// Match a resume against a job description
    Match(commands::matching::MatchArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Show or change the light/dark preference
    Theme {
        #[arg(value_enum)]
        mode: Option<commands::theme::ThemeMode>,
    },
    /// Print shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

fn setup_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = std::env::var(LOG_ENV)
        .ok()
        .and_then(|directive| EnvFilter::try_new(directive).ok())
        .unwrap_or_else(|| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

async fn run(command: Commands) -> Result<(), Box<dyn Error>> {
    match command {
        Commands::Auth { action } => {
            let ctx = Context::load()?;
            let result = commands::auth::run(&ctx, action).await;
            ctx.finish(result)
        }
        Commands::Profile { action } => {
            let ctx = Context::load()?;
            let result = commands::profile::run(&ctx, action).await;
            ctx.finish(result)
        }
        Commands::Account { action } => {
            let ctx = Context::load()?;
            let result = commands::account::run(&ctx, action).await;
            ctx.finish(result)
        }
        Commands::Match(args) => {
            let ctx = Context::load()?;
            let result = commands::matching::run(&ctx, args).await;
            ctx.finish(result)
        }
        Commands::Config { action } => commands::config::run(action),
        Commands::Theme { mode } => commands::theme::run(mode),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "resumatch", &mut std::io::stdout());
            Ok(())
        }
    }
}

fn is_unauthorized(err: &(dyn Error + 'static)) -> bool {
    err.downcast_ref::<CoreError>()
        .is_some_and(CoreError::is_unauthorized)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    if let Err(e) = run(cli.command).await {
        if is_unauthorized(e.as_ref()) {
            eprintln!("session expired: please log in again");
        } else {
            eprintln!("error: {e}");
        }
        std::process::exit(1);
    }
}
