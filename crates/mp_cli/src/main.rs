//! Matchpoint CLI
//!
//! Runs the match lifecycle engine against a snapshot file on disk, so a
//! group can be organized from the terminal without any hosted backend.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use clap::{Parser, Subcommand, ValueEnum};

use mp_core::{
    AppConfig, LocalIdentity, Match, MatchDraft, MatchStatus, Matchpoint, MemoryStore, Outcome,
    PostKind, RankingWindow, SnapshotFile, UserProfile,
};

#[derive(Parser)]
#[command(name = "matchpoint")]
#[command(about = "Organize group matches, attendance and rankings", long_about = None)]
struct Cli {
    /// Snapshot file holding the group's data
    #[arg(long, default_value = "matchpoint.mps")]
    data: PathBuf,

    /// Acting user id
    #[arg(long)]
    user: Option<String>,

    /// Acting user display name (defaults to the user id)
    #[arg(long)]
    name: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Schedule a new match
    Create {
        /// Venue
        #[arg(long)]
        location: String,

        /// Date (YYYY-MM-DD, local)
        #[arg(long)]
        date: String,

        /// Start time (HH:MM, local)
        #[arg(long)]
        time: String,

        /// Total slots
        #[arg(long, default_value = "14")]
        capacity: u32,
    },

    /// List matches, soonest first
    List,

    /// Join a match roster
    Join { match_id: String },

    /// Leave a match roster
    Leave { match_id: String },

    /// Record an attendance verdict for a player (creator only)
    Outcome {
        match_id: String,
        player_id: String,
        #[arg(value_enum)]
        verdict: Verdict,
    },

    /// Close a match and write the point ledger (creator only)
    Finalize { match_id: String },

    /// Delete an open match (creator only)
    Delete { match_id: String },

    /// Show the leaderboard
    Ranking {
        #[arg(long, value_enum, default_value = "month")]
        window: Window,
    },

    /// Post a message to the group board
    Post {
        body: String,

        /// Treat the body as an image URL
        #[arg(long)]
        image: bool,
    },

    /// Show the group board, newest first
    Feed {
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Export the group's data as JSON for inspection
    Export {
        /// Output JSON file path
        #[arg(long)]
        out: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Verdict {
    Present,
    Absent,
    Unset,
}

impl From<Verdict> for Outcome {
    fn from(v: Verdict) -> Self {
        match v {
            Verdict::Present => Outcome::Present,
            Verdict::Absent => Outcome::Absent,
            Verdict::Unset => Outcome::Unset,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Window {
    All,
    Month,
}

impl From<Window> for RankingWindow {
    fn from(w: Window) -> Self {
        match w {
            Window::All => RankingWindow::All,
            Window::Month => RankingWindow::CurrentMonth,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let snapshot_file = SnapshotFile::new(&cli.data);
    let store = if snapshot_file.exists() {
        Arc::new(MemoryStore::from_snapshot(snapshot_file.load()?))
    } else {
        Arc::new(MemoryStore::new())
    };

    let identity = Arc::new(LocalIdentity::new());
    if let Some(user_id) = &cli.user {
        let name = cli.name.clone().unwrap_or_else(|| user_id.clone());
        identity.sign_in(UserProfile::new(user_id.clone(), name));
    }

    let app = Matchpoint::new(AppConfig::default(), identity, store.clone());

    match &cli.command {
        Commands::Create { location, date, time, capacity } => {
            let scheduled_at = parse_schedule(date, time)?;
            let draft = MatchDraft {
                location: location.clone(),
                scheduled_at,
                capacity: *capacity,
            };
            let m = app.create_match(&draft)?;
            println!("created match {} at {} ({} slots)", short_id(&m.id), m.location, m.capacity);
        }

        Commands::List => {
            let matches = app.matches()?;
            if matches.is_empty() {
                println!("no matches scheduled");
            }
            for m in matches {
                print_match(&m);
            }
        }

        Commands::Join { match_id } => {
            let id = resolve_match_id(&app, match_id)?;
            let m = app.join_match(&id)?;
            println!("joined {} ({}/{} slots taken)", m.location, m.roster.len(), m.capacity);
        }

        Commands::Leave { match_id } => {
            let id = resolve_match_id(&app, match_id)?;
            let m = app.leave_match(&id)?;
            println!("left {} ({}/{} slots taken)", m.location, m.roster.len(), m.capacity);
        }

        Commands::Outcome { match_id, player_id, verdict } => {
            let id = resolve_match_id(&app, match_id)?;
            app.set_outcome(&id, player_id, (*verdict).into())?;
            println!("recorded {:?} for {}", Outcome::from(*verdict), player_id);
        }

        Commands::Finalize { match_id } => {
            let id = resolve_match_id(&app, match_id)?;
            let summary = app.finalize_match(&id)?;
            println!("finalized {}: {} players scored", summary.finalized.location, summary.records_written);
        }

        Commands::Delete { match_id } => {
            let id = resolve_match_id(&app, match_id)?;
            app.delete_match(&id)?;
            println!("match deleted");
        }

        Commands::Ranking { window } => {
            let rows = app.ranking((*window).into())?;
            if rows.is_empty() {
                println!("no points recorded yet");
            }
            for (idx, row) in rows.iter().enumerate() {
                println!(
                    "{:>3}. {:<20} {:>5} pts  ({} matches)",
                    idx + 1,
                    row.display_name,
                    row.total_points,
                    row.match_count
                );
            }
        }

        Commands::Post { body, image } => {
            let kind = if *image { PostKind::Image } else { PostKind::Text };
            app.post_message(body, kind)?;
            println!("posted");
        }

        Commands::Feed { limit } => {
            let posts = app.feed()?;
            if posts.is_empty() {
                println!("the board is empty");
            }
            for post in posts.iter().take(*limit) {
                println!(
                    "[{}] {}: {}",
                    format_local(post.created_at),
                    post.author_name,
                    post.body
                );
            }
        }

        Commands::Export { out } => {
            let json = mp_core::snapshot_to_json(&store.to_snapshot())?;
            std::fs::write(out, json).with_context(|| format!("writing {}", out.display()))?;
            println!("exported to {}", out.display());
        }
    }

    snapshot_file.save(&store.to_snapshot())?;
    Ok(())
}

/// Combine a local date and time into the stored UTC instant.
fn parse_schedule(date: &str, time: &str) -> Result<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").context("date must be YYYY-MM-DD")?;
    let time = NaiveTime::parse_from_str(time, "%H:%M").context("time must be HH:MM")?;
    let local = Local
        .from_local_datetime(&date.and_time(time))
        .single()
        .ok_or_else(|| anyhow!("ambiguous or invalid local datetime"))?;
    Ok(local.with_timezone(&Utc))
}

fn resolve_match_id(app: &Matchpoint, prefix: &str) -> Result<String> {
    let mut hits: Vec<Match> =
        app.matches()?.into_iter().filter(|m| m.id.starts_with(prefix)).collect();
    match hits.len() {
        0 => bail!("no match with id starting '{}'", prefix),
        1 => Ok(hits.remove(0).id),
        n => bail!("'{}' is ambiguous ({} candidates)", prefix, n),
    }
}

fn print_match(m: &Match) {
    let status = match m.status {
        MatchStatus::Open => "open",
        MatchStatus::Finished => "finished",
    };
    println!(
        "{}  {}  {}  [{}]  {}/{} slots",
        short_id(&m.id),
        format_local(m.scheduled_at),
        m.location,
        status,
        m.roster.len(),
        m.capacity
    );
    for entry in &m.roster {
        let marker = match entry.outcome {
            Outcome::Present => '+',
            Outcome::Absent => '-',
            Outcome::Unset => '?',
        };
        println!("      {} {} ({})", marker, entry.display_name, entry.user_id);
    }
}

fn short_id(id: &str) -> &str {
    &id[..id.len().min(8)]
}

fn format_local(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}
