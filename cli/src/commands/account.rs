//! LOGIN and REGISTER commands - Account access.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{HumanReadable, make_request, output};

/// Arguments for the login command.
#[derive(Args)]
pub struct LoginArgs {
    pub username: String,

    /// Password (prompted for when omitted)
    #[arg(long, env = "ELIBRARY_PASSWORD")]
    pub password: Option<String>,
}

/// Arguments for the register command.
#[derive(Args)]
pub struct RegisterArgs {
    pub username: String,

    /// Password (prompted for when omitted)
    #[arg(long, env = "ELIBRARY_PASSWORD")]
    pub password: Option<String>,

    /// Name shown on reviews and the profile
    #[arg(long)]
    pub display_name: Option<String>,
}

#[derive(Serialize)]
struct Credentials {
    username: String,
    password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    display_name: Option<String>,
}

/// Response from logging in.
#[derive(Debug, Deserialize, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user_id: Uuid,
    pub username: String,
    pub role: String,
    pub expires_in_hours: u64,
}

impl HumanReadable for LoginResponse {
    fn print_human(&self) {
        println!("{}", "Logged in.".green().bold());
        println!();
        println!("  {} {}", "User:".cyan(), self.username);
        println!("  {} {}", "Role:".cyan(), self.role);
        println!(
            "  {} {} hours",
            "Token valid for:".cyan(),
            self.expires_in_hours
        );
        println!();
        println!("export ELIBRARY_TOKEN={}", self.token);
    }
}

/// Response from registering.
#[derive(Debug, Deserialize, Serialize)]
pub struct RegisterResponse {
    pub id: Uuid,
    pub username: String,
    pub role: String,
}

impl HumanReadable for RegisterResponse {
    fn print_human(&self) {
        println!("{}", "Account created.".green().bold());
        println!();
        println!("  {} {}", "ID:".cyan(), self.id);
        println!("  {} {}", "Username:".cyan(), self.username);
        println!();
        println!(
            "  {}",
            format!("Run `elibrary login {}` to get a token.", self.username).dimmed()
        );
    }
}

fn read_password(given: Option<String>) -> Result<String> {
    if let Some(password) = given {
        return Ok(password);
    }

    use std::io::Write;
    eprint!("Password: ");
    std::io::stderr().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim_end_matches(['\r', '\n']).to_string())
}

/// Execute the login command.
pub async fn login(client: &Client, base_url: &str, human: bool, args: LoginArgs) -> Result<()> {
    let body = Credentials {
        username: args.username,
        password: read_password(args.password)?,
        display_name: None,
    };
    let url = format!("{base_url}/api/auth/login");

    let response: LoginResponse = make_request(client.post(&url).json(&body)).await?;

    output(&response, human)
}

/// Execute the register command.
pub async fn register(
    client: &Client,
    base_url: &str,
    human: bool,
    args: RegisterArgs,
) -> Result<()> {
    let body = Credentials {
        username: args.username,
        password: read_password(args.password)?,
        display_name: args.display_name,
    };
    let url = format!("{base_url}/api/auth/register");

    let response: RegisterResponse = make_request(client.post(&url).json(&body)).await?;

    output(&response, human)
}
