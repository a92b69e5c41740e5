// Entrypoint for the CLI application.
// - Parses arguments, loads config, logs in, then either runs one command
//   or hands the client to the interactive shell.
// - A failed login is the one error that ends the process with status 1.

use clap::{Parser, Subcommand};
use dialoguer::Password;
use lanzou_cli::config::{self, Config, Credentials};
use lanzou_cli::ui::{App, Command};
use lanzou_cli::{logging, LanzouClient};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Config file (defaults to <config dir>/lanzou-cli/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Run one command; without one, start the interactive shell
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the current folder
    Pwd,
    /// List folder contents
    Ls,
    /// Enter a folder (`..` for the parent)
    Cd { name: Option<String> },
    /// Create a folder
    Mkdir {
        name: Option<String>,
        #[arg(short, long, default_value = "")]
        description: String,
    },
    /// Delete a folder by name
    Rmdir { name: Option<String> },
    /// Upload a file and print its share link
    Upload { path: Option<PathBuf> },
    /// Delete a file by name
    Rm { name: Option<String> },
}

impl From<Commands> for Command {
    fn from(command: Commands) -> Self {
        match command {
            Commands::Pwd => Command::Pwd,
            Commands::Ls => Command::Ls,
            Commands::Cd { name } => Command::Cd(name),
            Commands::Mkdir { name, description } => Command::Mkdir { name, description },
            Commands::Rmdir { name } => Command::Rmdir(name),
            Commands::Upload { path } => Command::Upload(path),
            Commands::Rm { name } => Command::Rm(name),
        }
    }
}

fn print_config_help() {
    println!("\n=== configuration error ===");
    println!("set LANZOU_USERNAME / LANZOU_PASSWORD, or write a config file:");
    if let Some(path) = config::default_config_path() {
        println!("  {}", path.display());
    }
    println!("\n{}", config::EXAMPLE_CONFIG);
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = Config::load(cli.config.as_deref())?;
    let (username, password) = match config.credentials() {
        Credentials::Complete { username, password } => (username, password),
        // Only the interactive shell has a terminal to ask on.
        Credentials::PasswordMissing { username } if cli.command.is_none() => {
            let password = Password::new()
                .with_prompt(format!("Password for {}", username))
                .interact()?;
            (username, password)
        }
        Credentials::PasswordMissing { .. } | Credentials::Unconfigured => {
            print_config_help();
            return Ok(());
        }
    };

    let client = LanzouClient::from_config(&config)?;
    let mut app = App::new(client);
    if let Err(e) = app.login(&username, &password) {
        eprintln!("✗ {}", e);
        if e.is_fatal() {
            std::process::exit(1);
        }
        return Err(e.into());
    }

    match cli.command {
        None => app.run_shell(&username)?,
        Some(command) => app.run_once(command.into()),
    }
    Ok(())
}
