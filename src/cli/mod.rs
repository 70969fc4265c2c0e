//! CLI entry point for petsit.

pub mod auth;

use clap::{Parser, Subcommand};

/// Pet-sitting marketplace session CLI
#[derive(Parser, Debug)]
#[command(name = "petsit", version, about = "petsit: session and API CLI")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Session management
    Auth(AuthArgs),
    /// Fetch an API path with the stored session and print the body
    Get(GetArgs),
}

/// Arguments for the `auth` subcommand group.
#[derive(Parser, Debug)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommands,
}

/// Auth subcommands.
#[derive(Subcommand, Debug)]
pub enum AuthCommands {
    /// Sign in with email and password
    Login(LoginArgs),
    /// Create an account and sign in
    Register(RegisterArgs),
    /// Show the stored session
    Status,
    /// Forget the stored session
    Logout,
}

/// Arguments for `petsit auth login`.
#[derive(Parser, Debug)]
pub struct LoginArgs {
    #[arg(long)]
    pub email: String,
    #[arg(long)]
    pub password: String,
}

/// Arguments for `petsit auth register`.
#[derive(Parser, Debug)]
pub struct RegisterArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub email: String,
    #[arg(long)]
    pub password: String,
    #[arg(long)]
    pub phone: Option<String>,
}

/// Arguments for `petsit get`.
#[derive(Parser, Debug)]
pub struct GetArgs {
    /// Path relative to the base URL, e.g. /bookings
    pub path: String,
}
