//! Memory commands for the hierarchical memory store.
//!
//! Every command runs against the local store selected by the config:
//! - memorize: Original → Episode → Semantic → Theme
//! - retrieve: facts plus their themes and episodes
//! - stats / get / delete: inspection and cleanup
//! - tools: agent tool descriptors

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use colored::Colorize;
use mempro_sdk::{
    MemorizeOptions, MemoryLevel, MemoryService, MemoryTools, MemoryType, Metadata,
    RetrieveResult,
};

use crate::cli::Commands;

/// Execute a command.
pub async fn execute(command: Commands, service: &Arc<MemoryService>) -> Result<()> {
    match command {
        Commands::Memorize {
            content,
            memory_type,
            entities,
            confidence,
            speaker,
            session,
        } => {
            memorize(
                service,
                &content,
                memory_type,
                entities,
                confidence,
                speaker,
                session,
            )
            .await
        }

        Commands::Retrieve { query, top_k, json } => retrieve(service, &query, top_k, json).await,

        Commands::Stats { json } => stats(service, json).await,

        Commands::Get { id, level } => get(service, &id, level).await,

        Commands::Delete { id, level } => delete(service, &id, level).await,

        Commands::Tools => tools(service),
    }
}

/// Store content through the hierarchy.
async fn memorize(
    service: &MemoryService,
    content: &str,
    memory_type: MemoryType,
    entities: Vec<String>,
    confidence: f64,
    speaker: Option<String>,
    session: Option<String>,
) -> Result<()> {
    let mut metadata = Metadata::new();
    if let Some(speaker) = speaker {
        metadata.insert("speaker".into(), speaker.into());
    }
    if let Some(session) = session {
        metadata.insert("session_id".into(), session.into());
    }

    let options = MemorizeOptions::default()
        .with_type(memory_type)
        .with_entities(entities)
        .with_confidence(confidence)
        .with_metadata(metadata);

    let result = service
        .memorize(content, options)
        .await
        .context("Failed to memorize")?;

    if !result.success {
        println!("{} Memorize stopped early: {}", "⚠".yellow(), result.message);
    } else {
        println!("{} Memorized as {}", "✓".green(), memory_type.as_str().cyan());
    }

    let rows = [
        ("Original", result.original_id.as_deref()),
        ("Episode", result.episode_id.as_deref()),
        ("Semantic", result.semantic_id.as_deref()),
        ("Theme", result.theme_id.as_deref()),
    ];
    for (label, id) in rows {
        match id {
            Some(id) => println!("  {:<9} {}", format!("{label}:"), id),
            None => println!("  {:<9} {}", format!("{label}:"), "-".dimmed()),
        }
    }

    if !result.success {
        bail!("memorize did not complete");
    }
    Ok(())
}

/// Retrieve facts matching a query.
async fn retrieve(service: &MemoryService, query: &str, top_k: Option<usize>, json: bool) -> Result<()> {
    let result = service
        .retrieve(query, top_k)
        .await
        .context("Failed to retrieve memories")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    print_retrieval(query, &result);
    Ok(())
}

fn print_retrieval(query: &str, result: &RetrieveResult) {
    if result.semantics.is_empty() {
        println!("{} No memories match '{}'", "⚠".yellow(), query);
        return;
    }

    println!(
        "{} {} fact(s) for '{}'",
        "🧠".cyan(),
        result.semantics.len(),
        query.bold()
    );
    println!();

    for semantic in &result.semantics {
        println!(
            "  {} {} [{}] {}",
            "•".green(),
            semantic.content,
            semantic.memory_type.as_str().cyan(),
            format!("{:.0}%", semantic.confidence * 100.0).dimmed()
        );
        if !semantic.entity_refs.is_empty() {
            println!("    Entities: {}", semantic.entity_refs.join(", ").dimmed());
        }
    }

    if !result.themes.is_empty() {
        println!();
        println!("  Themes:");
        for theme in &result.themes {
            println!(
                "    {} ({} fact(s))",
                theme.name.cyan(),
                theme.semantic_ids.len()
            );
        }
    }

    if !result.episodes.is_empty() {
        println!();
        println!("  Episodes:");
        for episode in &result.episodes {
            println!(
                "    {} {}",
                episode.start_time.format("%Y-%m-%d %H:%M").to_string().dimmed(),
                truncate(&episode.summary, 72)
            );
        }
    }

    println!();
    println!(
        "  ~{} tokens, evidence density {:.2}",
        result.total_tokens, result.evidence_density
    );
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}

/// Show record counts.
async fn stats(service: &MemoryService, json: bool) -> Result<()> {
    let stats = service.stats().await.context("Failed to get memory stats")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("{} Memory Statistics", "📊".cyan());
    println!();
    println!("  Total records: {}", stats.total.to_string().bold());
    println!();
    println!("  By level:");
    println!("    Original: {}", stats.count(MemoryLevel::Original).to_string().yellow());
    println!("    Episode:  {}", stats.count(MemoryLevel::Episode).to_string().cyan());
    println!("    Semantic: {}", stats.count(MemoryLevel::Semantic).to_string().green());
    println!("    Theme:    {}", stats.count(MemoryLevel::Theme).to_string().magenta());

    if !stats.by_type.is_empty() {
        println!();
        println!("  Facts by type:");
        for (memory_type, count) in &stats.by_type {
            println!("    {:<11} {}", format!("{memory_type}:"), count);
        }
        println!();
        println!("  Average confidence: {:.2}", stats.avg_confidence);
    }

    Ok(())
}

/// Show one record.
async fn get(service: &MemoryService, id: &str, level: MemoryLevel) -> Result<()> {
    let record = service
        .get(id, level)
        .await
        .context("Failed to get record")?
        .ok_or_else(|| anyhow::anyhow!("No {} record with id {}", level, id))?;

    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

/// Delete one record.
async fn delete(service: &MemoryService, id: &str, level: MemoryLevel) -> Result<()> {
    let deleted = service
        .delete(id, level)
        .await
        .context("Failed to delete record")?;

    if deleted {
        println!("{} Deleted {} record: {}", "✓".green(), level, id);
    } else {
        println!("{} {} record not found: {}", "⚠".yellow(), level, id);
    }
    Ok(())
}

/// Print tool descriptors.
fn tools(service: &Arc<MemoryService>) -> Result<()> {
    let tools = MemoryTools::new(Arc::clone(service));
    println!("{}", serde_json::to_string_pretty(&tools.definitions())?);
    Ok(())
}
