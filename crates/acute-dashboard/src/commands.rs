use acute_core::{IdentityNormalizer, NewSummary, Summary, SummaryKey, SummaryPatch, SummaryStatus};
use acute_sync::{SummaryClient, SyncConfig};
use anyhow::{bail, Context, Result};
use chrono::SecondsFormat;
use clap::{Args, Subcommand};
use std::fs;
use std::path::PathBuf;
use tracing::info;

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
pub enum Command {
    /// Print every case in the collection
    List(ListArgs),
    /// Print one case
    Show(ShowArgs),
    /// Create a case from a JSON file
    Create(CreateArgs),
    /// Change fields of an existing case
    Update(UpdateArgs),
    /// Remove a case
    #[command(alias = "rm")]
    Delete(DeleteArgs),
}

#[derive(Args, Debug)]
pub struct ListArgs {
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    pub key: SummaryKey,
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    #[arg(long)]
    pub file: PathBuf,
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    pub key: SummaryKey,
    #[arg(long)]
    pub status: Option<SummaryStatus>,
    #[arg(long)]
    pub ai_summary: Option<String>,
    #[arg(long)]
    pub title: Option<String>,
}

#[derive(Args, Debug)]
pub struct DeleteArgs {
    pub key: SummaryKey,
}

pub async fn run(command: Command, config: &SyncConfig) -> Result<()> {
    let client = SummaryClient::new(config).context("Failed to build summary client")?;

    match command {
        Command::List(args) => list_summaries(&client, &args).await,
        Command::Show(args) => show_summary(&client, &args).await,
        Command::Create(args) => create_summary(&client, &args).await,
        Command::Update(args) => update_summary(&client, args).await,
        Command::Delete(args) => delete_summary(&client, &args).await,
    }
}

async fn list_summaries(client: &SummaryClient, args: &ListArgs) -> Result<()> {
    let raws = client
        .fetch_all()
        .await
        .context("Failed to fetch summaries")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&raws)?);
        return Ok(());
    }

    let summaries = IdentityNormalizer::new().normalize_snapshot(raws);
    if summaries.is_empty() {
        println!("No summaries found at {}", client.base_url());
        return Ok(());
    }
    for summary in &summaries {
        println!(
            "- [{}] ({}) {} {}",
            summary.key,
            summary.status,
            format_date(summary),
            summary.title
        );
    }
    Ok(())
}

async fn show_summary(client: &SummaryClient, args: &ShowArgs) -> Result<()> {
    let raw = client
        .fetch_one(&args.key)
        .await
        .with_context(|| format!("Failed to fetch summary {}", args.key))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&raw)?);
        return Ok(());
    }

    let summary = IdentityNormalizer::new().normalize(raw);
    print_summary(&summary);
    Ok(())
}

async fn create_summary(client: &SummaryClient, args: &CreateArgs) -> Result<()> {
    let content = fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let summary: NewSummary = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", args.file.display()))?;

    let created = client
        .create(&summary)
        .await
        .context("Failed to create summary")?;
    let created = IdentityNormalizer::new().normalize(created);
    info!(key = %created.key, "summary_created");
    println!("Created summary {} ({})", created.key, created.status);
    Ok(())
}

async fn update_summary(client: &SummaryClient, args: UpdateArgs) -> Result<()> {
    let patch = SummaryPatch {
        status: args.status,
        ai_summary: args.ai_summary,
        title: args.title,
        ..SummaryPatch::default()
    };
    if patch.is_empty() {
        bail!("Nothing to update: pass --status, --ai-summary or --title");
    }

    let updated = client
        .update(&args.key, &patch)
        .await
        .with_context(|| format!("Failed to update summary {}", args.key))?;
    let updated = IdentityNormalizer::new().normalize(updated);
    info!(key = %args.key, "summary_updated");
    println!("Updated summary {} ({})", args.key, updated.status);
    Ok(())
}

async fn delete_summary(client: &SummaryClient, args: &DeleteArgs) -> Result<()> {
    client
        .delete(&args.key)
        .await
        .with_context(|| format!("Failed to delete summary {}", args.key))?;
    info!(key = %args.key, "summary_deleted");
    println!("Deleted summary {}", args.key);
    Ok(())
}

fn print_summary(summary: &Summary) {
    println!("{} [{}]", summary.title, summary.status);
    println!("key: {}", summary.key);
    println!("date: {}", format_date(summary));
    if let Some(ai_summary) = &summary.ai_summary {
        println!();
        println!("Summary:");
        println!("{ai_summary}");
    }
    if !summary.ambulance_notes.is_empty() {
        println!();
        println!("Notes:");
        println!("{}", summary.ambulance_notes);
    }
    if !summary.timeline_events.is_empty() {
        println!();
        println!("Timeline:");
        for event in &summary.timeline_events {
            println!("- {} {}", event.timestamp, event.description);
        }
    }
    let journal = &summary.medical_journal;
    if !journal.is_empty() {
        println!();
        println!("Journal:");
        for entry in journal.critical_information() {
            println!("- critical: {} ({})", entry.condition, entry.details);
        }
        for entry in journal.current_medications() {
            println!("- medication: {} ({})", entry.medication, entry.reason);
        }
        for entry in journal.allergy_information() {
            println!("- allergy: {} ({})", entry.allergy_name, entry.details);
        }
    }
}

fn format_date(summary: &Summary) -> String {
    summary
        .date
        .map(|date| date.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| "-".to_string())
}
