//! petsit CLI binary entry point.

use clap::Parser;
use petsit::auth::Registration;
use petsit::cli::{AuthCommands, Cli, Commands};
use petsit::config::SessionConfig;
use petsit::session::Session;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("PETSIT_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = SessionConfig::from_env()?;
    let session = Session::from_config(&config)?;

    match cli.command {
        Commands::Auth(auth_args) => match auth_args.command {
            AuthCommands::Login(args) => {
                petsit::cli::auth::handle_login(&session, &args.email, &args.password).await
            }
            AuthCommands::Register(args) => {
                let registration = Registration {
                    name: args.name,
                    email: args.email,
                    password: args.password,
                    phone: args.phone,
                };
                petsit::cli::auth::handle_register(&session, registration).await
            }
            AuthCommands::Status => petsit::cli::auth::handle_status(&session),
            AuthCommands::Logout => petsit::cli::auth::handle_logout(&session),
        },
        Commands::Get(args) => petsit::cli::auth::handle_get(&session, &args.path).await,
    }
}
