//! Keyword management command handlers.
//!
//! `import` reads a YAML seed file and skips keywords the workspace already
//! tracks, so re-running it is safe.

use std::path::PathBuf;

use clap::Subcommand;
use painradar_db::{DbError, KeywordRow, KeywordUpdate};
use uuid::Uuid;

/// Sub-commands available under `keywords`.
#[derive(Debug, Subcommand)]
pub enum KeywordCommands {
    /// Add one keyword to a workspace
    Add {
        #[arg(long)]
        workspace: Uuid,
        /// Phrase to monitor
        keyword: String,
        #[arg(long)]
        category: Option<String>,
    },
    /// List a workspace's keywords with post and scan counts
    List {
        #[arg(long)]
        workspace: Uuid,
    },
    /// Import keywords from a YAML seed file
    Import {
        #[arg(long)]
        workspace: Uuid,
        /// Path to the seed file
        #[arg(long, default_value = "config/keywords.yaml")]
        file: PathBuf,
    },
    /// Stop scanning a keyword without deleting its history
    Disable {
        #[arg(long)]
        workspace: Uuid,
        keyword_id: Uuid,
    },
}

pub(crate) async fn run(pool: &sqlx::PgPool, command: KeywordCommands) -> anyhow::Result<()> {
    match command {
        KeywordCommands::Add {
            workspace,
            keyword,
            category,
        } => {
            let keyword = painradar_core::validate_keyword(&keyword)?;
            let category = painradar_core::validate_category(category.as_deref())?;
            let row = add_keyword(pool, workspace, &keyword, category.as_deref()).await?;
            println!("added keyword '{}' ({})", row.keyword, row.id);
        }
        KeywordCommands::List { workspace } => list_keywords(pool, workspace).await?,
        KeywordCommands::Import { workspace, file } => {
            import_keywords(pool, workspace, &file).await?;
        }
        KeywordCommands::Disable {
            workspace,
            keyword_id,
        } => {
            let update = KeywordUpdate {
                is_active: Some(false),
                ..KeywordUpdate::default()
            };
            let row = painradar_db::update_keyword(pool, workspace, keyword_id, update).await?;
            println!("disabled keyword '{}'", row.keyword);
        }
    }
    Ok(())
}

/// Create a keyword and record the activity entry. Activity failures are
/// logged, not returned.
async fn add_keyword(
    pool: &sqlx::PgPool,
    workspace_id: Uuid,
    keyword: &str,
    category: Option<&str>,
) -> Result<KeywordRow, DbError> {
    let row = painradar_db::create_keyword(pool, workspace_id, keyword, category, None).await?;

    let activity = painradar_db::NewActivity {
        workspace_id,
        user_id: None,
        activity_type: "CREATE",
        entity_type: "pain_keyword",
        entity_id: row.id.to_string(),
        action: "created",
        new_value: serde_json::json!({ "keyword": row.keyword }),
    };
    if let Err(e) = painradar_db::insert_activity(pool, &activity).await {
        tracing::warn!(keyword_id = %row.id, error = %e, "failed to record keyword activity");
    }
    Ok(row)
}

async fn list_keywords(pool: &sqlx::PgPool, workspace_id: Uuid) -> anyhow::Result<()> {
    let keywords = painradar_db::list_keywords_with_counts(pool, workspace_id).await?;
    if keywords.is_empty() {
        println!("no keywords for workspace {workspace_id}; run `keywords add` first");
        return Ok(());
    }

    println!(
        "{:<38}{:<32}{:<14}{:<8}{:>7}{:>7}",
        "ID", "KEYWORD", "CATEGORY", "ACTIVE", "POSTS", "SCANS"
    );
    for k in &keywords {
        println!(
            "{:<38}{:<32}{:<14}{:<8}{:>7}{:>7}",
            k.id,
            truncate(&k.keyword, 30),
            k.category.as_deref().unwrap_or("-"),
            if k.is_active { "yes" } else { "no" },
            k.post_count,
            k.scan_count
        );
    }
    Ok(())
}

async fn import_keywords(
    pool: &sqlx::PgPool,
    workspace_id: Uuid,
    path: &std::path::Path,
) -> anyhow::Result<()> {
    let seeds = painradar_core::load_keyword_seeds(path)?;

    let mut added = 0usize;
    let mut skipped = 0usize;
    for seed in &seeds.keywords {
        match add_keyword(pool, workspace_id, &seed.keyword, seed.category.as_deref()).await {
            Ok(_) => added += 1,
            Err(DbError::Conflict(_)) => {
                tracing::debug!(keyword = %seed.keyword, "keyword already tracked; skipping");
                skipped += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    println!(
        "imported {added} keyword(s) from {}; {skipped} already present",
        path.display()
    );
    Ok(())
}

pub(crate) fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        format!("{}...", text.chars().take(max_chars).collect::<String>())
    } else {
        text.to_string()
    }
}
