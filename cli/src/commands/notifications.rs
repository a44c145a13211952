//! NOTIFICATIONS command - Inbox listing, read marks and the live feed.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use colored::Colorize;
use reqwest::{Client, header};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ApiFailure, HumanReadable, format_timestamp, make_request, output};

/// Arguments for the notifications command.
#[derive(Args)]
pub struct NotificationsArgs {
    #[command(subcommand)]
    pub action: Option<NotificationAction>,
}

#[derive(Subcommand)]
pub enum NotificationAction {
    /// List notifications, newest first (default)
    List {
        /// Only unread notifications
        #[arg(long)]
        unread: bool,

        /// Maximum number to fetch
        #[arg(long)]
        take: Option<u32>,
    },

    /// Mark one notification as read
    Read { notification_id: Uuid },

    /// Mark every notification as read
    ReadAll,

    /// Print notifications as they arrive
    Watch,
}

#[derive(Serialize)]
struct ListQuery {
    unread_only: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    take: Option<u32>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Notification {
    pub id: Uuid,
    pub kind: String,
    pub title: String,
    pub body: String,
    pub book_id: Option<Uuid>,
    pub is_read: bool,
    pub created: DateTime<Utc>,
}

impl Notification {
    fn print_row(&self) {
        let marker = if self.is_read { " ".normal() } else { "*".yellow() };
        println!(
            "  {} {} {}",
            marker,
            self.title.bold(),
            format_timestamp(&self.created).dimmed()
        );
        println!("    {}", self.body);
        println!("    {} {}", "ID:".cyan(), self.id);
    }
}

impl HumanReadable for Notification {
    fn print_human(&self) {
        self.print_row();
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Inbox(pub Vec<Notification>);

impl HumanReadable for Inbox {
    fn print_human(&self) {
        println!("{}", "Notifications".green().bold());
        println!("{}", "=".repeat(70));
        println!();

        if self.0.is_empty() {
            println!("  {}", "(Inbox empty)".dimmed());
            return;
        }

        for notification in &self.0 {
            notification.print_row();
            println!();
        }
        let unread = self.0.iter().filter(|n| !n.is_read).count();
        println!("  {} {}", "Unread:".cyan(), unread);
        println!("  {}", "* = unread".dimmed());
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct MarkAllReadResponse {
    pub updated: u64,
}

impl HumanReadable for MarkAllReadResponse {
    fn print_human(&self) {
        println!(
            "{} {} notification(s) marked read.",
            "Done.".green().bold(),
            self.updated
        );
    }
}

/// Execute the notifications command.
pub async fn execute(
    client: &Client,
    base_url: &str,
    human: bool,
    args: NotificationsArgs,
) -> Result<()> {
    let action = args.action.unwrap_or(NotificationAction::List {
        unread: false,
        take: None,
    });

    match action {
        NotificationAction::List { unread, take } => {
            let query = ListQuery {
                unread_only: unread,
                take,
            };
            let url = format!("{base_url}/api/notifications");
            let response: Inbox = make_request(client.get(&url).query(&query)).await?;
            output(&response, human)
        }
        NotificationAction::Read { notification_id } => {
            let url = format!("{base_url}/api/notifications/{notification_id}/read");
            let response: Notification = make_request(client.post(&url)).await?;
            output(&response, human)
        }
        NotificationAction::ReadAll => {
            let url = format!("{base_url}/api/notifications/read-all");
            let response: MarkAllReadResponse = make_request(client.post(&url)).await?;
            output(&response, human)
        }
        NotificationAction::Watch => watch(client, base_url, human).await,
    }
}

/// Follows the SSE stream until the server closes it.
async fn watch(client: &Client, base_url: &str, human: bool) -> Result<()> {
    let url = format!("{base_url}/api/notifications/stream");
    let mut response = client
        .get(&url)
        .header(header::ACCEPT, "text/event-stream")
        .send()
        .await
        .context("failed to reach server")?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ApiFailure::from_body(status, &body).into());
    }

    if human {
        eprintln!("{}", "Watching for notifications (Ctrl+C to stop)...".dimmed());
    }

    // Bytes, not text: a chunk may end inside a multi-byte character.
    let mut buffer: Vec<u8> = Vec::new();
    while let Some(chunk) = response.chunk().await.context("stream interrupted")? {
        buffer.extend_from_slice(&chunk);
        while let Some(end) = buffer.windows(2).position(|w| w == b"\n\n") {
            let frame: Vec<u8> = buffer.drain(..end + 2).collect();
            if let Some(event) = SseFrame::parse(&String::from_utf8_lossy(&frame)) {
                print_event(&event, human)?;
            }
        }
    }
    Ok(())
}

fn print_event(event: &SseFrame, human: bool) -> Result<()> {
    match event.name.as_str() {
        "notification" => {
            let notification: Notification = serde_json::from_str(&event.data)?;
            output(&notification, human)
        }
        "catchup" if human => {
            eprintln!(
                "{}",
                "Some notifications were skipped; run `elibrary notifications` to see them."
                    .yellow()
            );
            Ok(())
        }
        "heartbeat" if human => Ok(()),
        _ => {
            if !human {
                println!("{}", event.data);
            }
            Ok(())
        }
    }
}

/// One `event:`/`data:` block of an event stream.
#[derive(Debug, PartialEq)]
struct SseFrame {
    name: String,
    data: String,
}

impl SseFrame {
    fn parse(frame: &str) -> Option<Self> {
        let mut name = String::from("message");
        let mut data = Vec::new();
        for line in frame.lines() {
            if let Some(value) = line.strip_prefix("event:") {
                name = value.trim().to_string();
            } else if let Some(value) = line.strip_prefix("data:") {
                data.push(value.strip_prefix(' ').unwrap_or(value));
            }
        }
        if data.is_empty() {
            return None;
        }
        Some(Self {
            name,
            data: data.join("\n"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_named_event() {
        let frame = SseFrame::parse("event: notification\ndata: {\"a\":1}\n\n").unwrap();
        assert_eq!(frame.name, "notification");
        assert_eq!(frame.data, "{\"a\":1}");
    }

    #[test]
    fn test_parse_multiline_data_and_default_name() {
        let frame = SseFrame::parse("data: one\ndata: two\n\n").unwrap();
        assert_eq!(frame.name, "message");
        assert_eq!(frame.data, "one\ntwo");
    }

    #[test]
    fn test_notification_payload_decodes() {
        let frame = SseFrame::parse(
            "event: notification\ndata: {\"type\":\"notification\",\"id\":\"67e55044-10b1-426f-9247-bb680e5fe0c8\",\"user_id\":\"67e55044-10b1-426f-9247-bb680e5fe0c9\",\"kind\":\"author_new_book\",\"title\":\"New book by Ted Chiang\",\"body\":\"\\\"Exhalation\\\" is now in the catalog.\",\"book_id\":null,\"author_id\":null,\"is_read\":false,\"created\":\"2026-01-01T00:00:00Z\"}\n\n",
        )
        .unwrap();
        let notification: Notification = serde_json::from_str(&frame.data).unwrap();
        assert_eq!(notification.kind, "author_new_book");
        assert!(!notification.is_read);
    }

    #[test]
    fn test_keep_alive_comment_is_skipped() {
        assert_eq!(SseFrame::parse(":\n\n"), None);
    }
}
