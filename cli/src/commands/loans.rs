//! BORROW, RETURN, RENEW and LOANS commands - Lending.

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Args, ValueEnum};
use colored::Colorize;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{HumanReadable, format_timestamp, make_request, output, truncate};

/// Arguments for the borrow command.
#[derive(Args)]
pub struct BorrowArgs {
    pub book_id: Uuid,

    /// Free-form note stored with the loan
    #[arg(long)]
    pub notes: Option<String>,
}

/// Arguments for the return and renew commands.
#[derive(Args)]
pub struct LoanIdArgs {
    pub borrow_id: Uuid,
}

#[derive(Clone, Copy, ValueEnum, Serialize)]
pub enum StatusFilter {
    Borrowed,
    Returned,
    Overdue,
}

/// Arguments for the loans command.
#[derive(Args)]
pub struct LoansArgs {
    /// Every reader's loans (admin only)
    #[arg(long)]
    pub all: bool,

    /// With --all: only loans in this state
    #[arg(long, value_enum, requires = "all")]
    pub status: Option<StatusFilter>,

    /// With --all: only loans of this user
    #[arg(long, requires = "all")]
    pub user: Option<Uuid>,
}

#[derive(Serialize)]
struct BorrowBody {
    book_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    notes: Option<String>,
}

#[derive(Serialize)]
struct LoanQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<StatusFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Loan {
    pub id: Uuid,
    pub user_id: Uuid,
    pub book_id: Uuid,
    pub book_title: String,
    pub borrowed_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
    pub status: String,
    pub notes: Option<String>,
    pub renewal_count: i32,
    #[serde(default)]
    pub overdue: bool,
}

impl Loan {
    fn print_row(&self) {
        let status = match (self.status.as_str(), self.overdue) {
            ("Borrowed", true) => "OVERDUE".red().bold(),
            ("Borrowed", false) => "Borrowed".green(),
            ("Overdue", _) => "Returned late".yellow(),
            (other, _) => other.normal(),
        };
        println!("  {} [{}]", truncate(&self.book_title, 50).bold(), status);
        println!("    {} {}", "Loan:".cyan(), self.id);
        println!(
            "    {} {}  {} {}",
            "Borrowed:".cyan(),
            format_timestamp(&self.borrowed_at),
            "Due:".cyan(),
            format_timestamp(&self.due_at)
        );
        if let Some(returned) = &self.returned_at {
            println!("    {} {}", "Returned:".cyan(), format_timestamp(returned));
        }
        if self.renewal_count > 0 {
            println!("    {} {}", "Renewals:".cyan(), self.renewal_count);
        }
        if let Some(notes) = &self.notes {
            println!("    {} {}", "Notes:".cyan(), notes);
        }
    }
}

impl HumanReadable for Loan {
    fn print_human(&self) {
        self.print_row();
    }
}

/// A list of loans.
#[derive(Debug, Deserialize, Serialize)]
#[serde(transparent)]
pub struct LoanList(pub Vec<Loan>);

impl HumanReadable for LoanList {
    fn print_human(&self) {
        println!("{}", "Loans".green().bold());
        println!("{}", "=".repeat(70));
        println!();

        if self.0.is_empty() {
            println!("  {}", "(No loans)".dimmed());
            return;
        }

        for loan in &self.0 {
            loan.print_row();
            println!();
        }
        println!("  {} {}", "Total:".cyan(), self.0.len());
    }
}

/// Execute the borrow command.
pub async fn borrow(client: &Client, base_url: &str, human: bool, args: BorrowArgs) -> Result<()> {
    let body = BorrowBody {
        book_id: args.book_id,
        notes: args.notes,
    };
    let url = format!("{base_url}/api/borrows");

    let response: Loan = make_request(client.post(&url).json(&body)).await?;

    output(&response, human)
}

/// Execute the return command.
pub async fn return_loan(
    client: &Client,
    base_url: &str,
    human: bool,
    args: LoanIdArgs,
) -> Result<()> {
    let url = format!("{base_url}/api/borrows/{}/return", args.borrow_id);

    let response: Loan = make_request(client.post(&url)).await?;

    output(&response, human)
}

/// Execute the renew command.
pub async fn renew(client: &Client, base_url: &str, human: bool, args: LoanIdArgs) -> Result<()> {
    let url = format!("{base_url}/api/borrows/{}/renew", args.borrow_id);

    let response: Loan = make_request(client.post(&url)).await?;

    output(&response, human)
}

/// Execute the loans command.
pub async fn list(client: &Client, base_url: &str, human: bool, args: LoansArgs) -> Result<()> {
    let request = if args.all {
        let query = LoanQuery {
            status: args.status,
            user_id: args.user,
        };
        client.get(format!("{base_url}/api/borrows")).query(&query)
    } else {
        client.get(format!("{base_url}/api/borrows/me"))
    };

    let response: LoanList = make_request(request).await?;

    output(&response, human)
}
