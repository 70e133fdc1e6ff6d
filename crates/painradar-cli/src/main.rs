mod keywords;
mod pipeline;

use clap::{Parser, Subcommand};
use painradar_core::Platform;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::keywords::KeywordCommands;

#[derive(Debug, Parser)]
#[command(name = "painradar-cli")]
#[command(about = "Pain Radar command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Manage monitored keywords
    Keywords {
        #[command(subcommand)]
        command: KeywordCommands,
    },
    /// Search platforms and rank results without storing anything
    Search {
        /// Search phrase
        query: String,
        /// Platforms to query, comma-separated (defaults to the configured set)
        #[arg(long = "platform", value_delimiter = ',')]
        platforms: Vec<Platform>,
        /// Maximum posts to return
        #[arg(long, default_value = "20")]
        limit: usize,
        /// Drop posts below this engagement
        #[arg(long, default_value = "0")]
        min_engagement: i64,
        /// Keep cross-platform duplicates
        #[arg(long)]
        no_dedupe: bool,
    },
    /// Scan one keyword and store new posts
    Scan {
        #[arg(long)]
        workspace: Uuid,
        #[arg(long)]
        keyword_id: Uuid,
        /// Platforms to scan, comma-separated (defaults to the configured set)
        #[arg(long = "platform", value_delimiter = ',')]
        platforms: Vec<Platform>,
    },
    /// Run relevance filtering and pain extraction over stored posts
    Analyze {
        #[arg(long)]
        workspace: Uuid,
        /// Post ids, comma-separated
        #[arg(long = "post", value_delimiter = ',', required = true)]
        post_ids: Vec<Uuid>,
    },
    /// Print the workspace dashboard
    Dashboard {
        #[arg(long)]
        workspace: Uuid,
        /// One of 7d, 30d, 90d
        #[arg(long, default_value = "30d")]
        period: String,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check database connectivity
    Ping,
    /// Apply pending migrations
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("painradar-cli ready; run with --help to list commands");
        return Ok(());
    };

    let config = painradar_core::load_app_config()?;

    match command {
        Commands::Db {
            command: DbCommands::Ping,
        } => {
            let pool = connect(&config).await?;
            painradar_db::health_check(&pool).await?;
            println!("database ok");
        }
        Commands::Db {
            command: DbCommands::Migrate,
        } => {
            let pool = connect(&config).await?;
            let applied = painradar_db::run_migrations(&pool).await?;
            println!("applied {applied} migration(s)");
        }
        Commands::Keywords { command } => {
            let pool = connect(&config).await?;
            keywords::run(&pool, command).await?;
        }
        Commands::Search {
            query,
            platforms,
            limit,
            min_engagement,
            no_dedupe,
        } => {
            pipeline::run_search(&config, &query, &platforms, limit, min_engagement, !no_dedupe)
                .await?;
        }
        Commands::Scan {
            workspace,
            keyword_id,
            platforms,
        } => {
            let pool = connect(&config).await?;
            let platforms = (!platforms.is_empty()).then_some(platforms);
            pipeline::run_scan(&pool, &config, workspace, keyword_id, platforms).await?;
        }
        Commands::Analyze {
            workspace,
            post_ids,
        } => {
            let pool = connect(&config).await?;
            pipeline::run_analyze(&pool, &config, workspace, post_ids).await?;
        }
        Commands::Dashboard { workspace, period } => {
            let pool = connect(&config).await?;
            pipeline::run_dashboard(&pool, workspace, &period).await?;
        }
    }

    Ok(())
}

async fn connect(config: &painradar_core::AppConfig) -> anyhow::Result<sqlx::PgPool> {
    let pool_config = painradar_db::PoolConfig::from_app_config(config);
    Ok(painradar_db::connect_pool(&config.database_url, pool_config).await?)
}
