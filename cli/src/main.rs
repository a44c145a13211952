//! Command-line interface for the eLibrary lending service.
//!
//! This CLI tool provides commands for everyday library use:
//! - login / register: Account access
//! - books / book: Search the catalog and show a title
//! - borrow / return / renew: Manage loans
//! - loans: List your loans (or everyone's, for admins)
//! - notifications: Inbox, read marks and the live feed
//! - profile: Reading stats and badges
//!
//! Configuration via environment:
//! - ELIBRARY_URL: Base URL of the server (default: http://localhost:3000)
//! - ELIBRARY_TOKEN: JWT Bearer token for authentication

mod commands;

use clap::{Parser, Subcommand};

use commands::{
    account::{LoginArgs, RegisterArgs},
    books::{BookArgs, BooksArgs},
    loans::{BorrowArgs, LoanIdArgs, LoansArgs},
    notifications::NotificationsArgs,
    profile::ProfileArgs,
};

/// eLibrary CLI
///
/// Talk to an eLibrary server from the command line. Prints JSON by
/// default; pass --human for formatted output.
#[derive(Parser)]
#[command(name = "elibrary")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Output human-readable formatted text instead of JSON
    #[arg(long, global = true)]
    human: bool,

    /// Server URL
    #[arg(
        long,
        env = "ELIBRARY_URL",
        default_value = "http://localhost:3000",
        global = true
    )]
    url: String,

    /// JWT Bearer token for authentication
    #[arg(long, env = "ELIBRARY_TOKEN", global = true, hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and print a token
    Login(LoginArgs),

    /// Create a reader account
    Register(RegisterArgs),

    /// Search the catalog
    Books(BooksArgs),

    /// Show one book
    Book(BookArgs),

    /// Borrow a book
    Borrow(BorrowArgs),

    /// Return a borrowed book
    Return(LoanIdArgs),

    /// Extend a loan
    Renew(LoanIdArgs),

    /// List loans
    Loans(LoansArgs),

    /// Read and manage notifications
    Notifications(NotificationsArgs),

    /// Show your reading profile
    Profile(ProfileArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let client = match commands::build_client(cli.token.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let url = cli.url.trim_end_matches('/');
    let human = cli.human;

    let result = match cli.command {
        Commands::Login(args) => commands::account::login(&client, url, human, args).await,
        Commands::Register(args) => commands::account::register(&client, url, human, args).await,
        Commands::Books(args) => commands::books::search(&client, url, human, args).await,
        Commands::Book(args) => commands::books::show(&client, url, human, args).await,
        Commands::Borrow(args) => commands::loans::borrow(&client, url, human, args).await,
        Commands::Return(args) => commands::loans::return_loan(&client, url, human, args).await,
        Commands::Renew(args) => commands::loans::renew(&client, url, human, args).await,
        Commands::Loans(args) => commands::loans::list(&client, url, human, args).await,
        Commands::Notifications(args) => {
            commands::notifications::execute(&client, url, human, args).await
        }
        Commands::Profile(args) => commands::profile::execute(&client, url, human, args).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_loans_all_with_status() {
        let cli = Cli::try_parse_from([
            "elibrary", "--human", "loans", "--all", "--status", "overdue",
        ])
        .unwrap();
        assert!(cli.human);
        assert!(matches!(cli.command, Commands::Loans(LoansArgs { all: true, .. })));
    }

    #[test]
    fn test_status_filter_requires_all() {
        assert!(Cli::try_parse_from(["elibrary", "loans", "--status", "returned"]).is_err());
    }
}
