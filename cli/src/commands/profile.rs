//! PROFILE command - Reading statistics and badges.

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Args;
use colored::Colorize;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{HumanReadable, format_timestamp, make_request, output};

/// Arguments for the profile command.
#[derive(Args)]
pub struct ProfileArgs {
    // No additional arguments needed
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    pub role: String,
    pub display_name: Option<String>,
    pub created: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct GenreCount {
    pub genre: String,
    pub count: u32,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Stats {
    pub books_read: u32,
    pub hours_read: f64,
    pub average_rating: f64,
    pub reviews_written: u32,
    pub top_genres: Vec<GenreCount>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Badge {
    pub code: String,
    pub name: String,
    pub description: String,
    pub achieved: bool,
    pub achieved_at: Option<DateTime<Utc>>,
}

/// Response from the profile endpoint.
#[derive(Debug, Deserialize, Serialize)]
pub struct ProfileResponse {
    pub user: Account,
    pub stats: Stats,
    pub badges: Vec<Badge>,
}

impl HumanReadable for ProfileResponse {
    fn print_human(&self) {
        let name = self
            .user
            .display_name
            .as_deref()
            .unwrap_or(&self.user.username);
        println!("{}", name.green().bold());
        println!("{}", "=".repeat(60));
        println!();
        println!("  {} {}", "Username:".cyan(), self.user.username);
        println!("  {} {}", "Role:".cyan(), self.user.role);
        println!(
            "  {} {}",
            "Member since:".cyan(),
            format_timestamp(&self.user.created)
        );

        println!();
        println!("{}", "Reading:".yellow());
        println!("  {} {}", "Books read:".cyan(), self.stats.books_read);
        println!("  {} {:.1}", "Hours read:".cyan(), self.stats.hours_read);
        println!(
            "  {} {} (avg {:.1})",
            "Reviews:".cyan(),
            self.stats.reviews_written,
            self.stats.average_rating
        );
        if !self.stats.top_genres.is_empty() {
            let genres: Vec<String> = self
                .stats
                .top_genres
                .iter()
                .map(|g| format!("{} ({})", g.genre, g.count))
                .collect();
            println!("  {} {}", "Top genres:".cyan(), genres.join(", "));
        }

        println!();
        println!("{}", "Badges:".yellow());
        for badge in &self.badges {
            match &badge.achieved_at {
                Some(at) => println!(
                    "  {} {} {}",
                    "✔".green(),
                    badge.name.bold(),
                    format_timestamp(at).dimmed()
                ),
                None => println!(
                    "  {} {} {}",
                    "·".dimmed(),
                    badge.name.dimmed(),
                    badge.description.dimmed()
                ),
            }
        }
    }
}

/// Execute the profile command.
pub async fn execute(client: &Client, base_url: &str, human: bool, _args: ProfileArgs) -> Result<()> {
    let url = format!("{base_url}/api/profile/me");

    let response: ProfileResponse = make_request(client.get(&url)).await?;

    output(&response, human)
}
