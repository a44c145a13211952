//! BOOKS and BOOK commands - Search the catalog and show one title.

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Args;
use colored::Colorize;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{HumanReadable, format_timestamp, make_request, output, stars, truncate};

/// Arguments for the books command.
#[derive(Args)]
pub struct BooksArgs {
    /// Free text over title, author, isbn and genre
    pub query: Option<String>,

    /// Filter by author name
    #[arg(long)]
    pub author: Option<String>,

    /// Filter by genre
    #[arg(long)]
    pub genre: Option<String>,

    /// Only books with a copy on the shelf
    #[arg(long)]
    pub available: bool,

    #[arg(long, default_value_t = 1)]
    pub page: u32,

    #[arg(long, default_value_t = 20)]
    pub page_size: u32,
}

#[derive(Serialize)]
struct SearchQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    q: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    genre: Option<String>,
    available_only: bool,
    page: u32,
    page_size: u32,
}

/// Arguments for the book command.
#[derive(Args)]
pub struct BookArgs {
    pub book_id: Uuid,

    /// Also list the reviews
    #[arg(long)]
    pub reviews: bool,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Book {
    pub id: Uuid,
    pub isbn: String,
    pub title: String,
    pub author_id: Uuid,
    pub author_name: String,
    pub genre: Option<String>,
    pub published_year: Option<i32>,
    pub description: Option<String>,
    pub total_copies: i32,
    pub available_copies: i32,
    pub average_rating: f64,
    pub review_count: i64,
}

/// One page of search results.
#[derive(Debug, Deserialize, Serialize)]
pub struct BookPage {
    pub total: i64,
    pub items: Vec<Book>,
    pub page: u32,
    pub page_size: u32,
}

impl HumanReadable for BookPage {
    fn print_human(&self) {
        println!("{}", "Catalog".green().bold());
        println!("{}", "=".repeat(80));
        println!();

        if self.items.is_empty() {
            println!("  {}", "(No books match)".dimmed());
            return;
        }

        for book in &self.items {
            let shelf = format!("{}/{}", book.available_copies, book.total_copies);
            let shelf = if book.available_copies > 0 {
                shelf.green()
            } else {
                shelf.red()
            };
            println!(
                "  {} {} {}",
                truncate(&book.title, 48).bold(),
                "by".dimmed(),
                book.author_name
            );
            println!("    {} {}", "ID:".cyan(), book.id);
            println!(
                "    {} {}  {} {}",
                "Copies:".cyan(),
                shelf,
                "Rating:".cyan(),
                stars(book.average_rating)
            );
            println!();
        }

        let size = i64::from(self.page_size.max(1));
        let pages = (self.total + size - 1) / size;
        println!(
            "  {} {} (page {} of {})",
            "Total:".cyan(),
            self.total,
            self.page,
            pages.max(1)
        );
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Review {
    pub username: String,
    pub rating: i32,
    pub comment: Option<String>,
    pub created: DateTime<Utc>,
}

/// A book, optionally with its reviews.
#[derive(Debug, Deserialize, Serialize)]
pub struct BookDetails {
    #[serde(flatten)]
    pub book: Book,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviews: Option<Vec<Review>>,
}

impl HumanReadable for BookDetails {
    fn print_human(&self) {
        let book = &self.book;
        println!("{}", book.title.green().bold());
        println!("{}", "=".repeat(70));
        println!();
        println!("  {} {}", "Author:".cyan(), book.author_name);
        println!("  {} {}", "ISBN:".cyan(), book.isbn);
        if let Some(genre) = &book.genre {
            println!("  {} {}", "Genre:".cyan(), genre);
        }
        if let Some(year) = book.published_year {
            println!("  {} {}", "Published:".cyan(), year);
        }
        println!(
            "  {} {} of {} available",
            "Copies:".cyan(),
            book.available_copies,
            book.total_copies
        );
        println!(
            "  {} {} {:.1} ({} reviews)",
            "Rating:".cyan(),
            stars(book.average_rating),
            book.average_rating,
            book.review_count
        );
        if let Some(description) = &book.description {
            println!();
            println!("{}", description);
        }

        if let Some(reviews) = &self.reviews {
            println!();
            println!("{}", "Reviews:".yellow());
            if reviews.is_empty() {
                println!("  {}", "(none yet)".dimmed());
            }
            for review in reviews {
                println!(
                    "  {} {} {}",
                    stars(f64::from(review.rating)),
                    review.username.bold(),
                    format_timestamp(&review.created).dimmed()
                );
                if let Some(comment) = &review.comment {
                    println!("    {}", comment);
                }
            }
        }
    }
}

/// Execute the books command.
pub async fn search(client: &Client, base_url: &str, human: bool, args: BooksArgs) -> Result<()> {
    let query = SearchQuery {
        q: args.query,
        author: args.author,
        genre: args.genre,
        available_only: args.available,
        page: args.page,
        page_size: args.page_size,
    };
    let url = format!("{base_url}/api/books");

    let response: BookPage = make_request(client.get(&url).query(&query)).await?;

    output(&response, human)
}

/// Execute the book command.
pub async fn show(client: &Client, base_url: &str, human: bool, args: BookArgs) -> Result<()> {
    let url = format!("{base_url}/api/books/{}/details", args.book_id);
    let book: Book = make_request(client.get(&url)).await?;

    let reviews = if args.reviews {
        let url = format!("{base_url}/api/reviews/book/{}", args.book_id);
        Some(make_request::<Vec<Review>>(client.get(&url)).await?)
    } else {
        None
    };

    output(&BookDetails { book, reviews }, human)
}
