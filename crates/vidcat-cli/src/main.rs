//! vidcat CLI: run video lifecycle operations against the catalog and blob store.
//!
//! Reads DATABASE_URL and the storage settings from the environment (or `.env`).

use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use sqlx::PgPool;
use validator::Validate;
use vidcat_cli::{init_tracing, ErrorReport};
use vidcat_core::models::{CreateVideoRequest, NewComment, UpdateVideoRequest, VideoId};
use vidcat_core::{AppError, Config};
use vidcat_db::{setup_database, CommentRepository, PgCatalog, VideoRepository};
use vidcat_services::{create_storage, CompensationExecutor, LifecycleOrchestrator};

#[derive(Parser)]
#[command(name = "vidcat", about = "Video catalog lifecycle CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a video whose cover and video blobs are already uploaded
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: Option<String>,
        /// Tag name (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long)]
        cover_key: String,
        #[arg(long)]
        video_key: String,
    },
    /// Rewrite a video's metadata, optionally pointing it at new blobs
    Update {
        video_id: VideoId,
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: Option<String>,
        /// Tag name (repeatable); replaces the current tag set
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long)]
        new_cover_key: Option<String>,
        #[arg(long)]
        new_video_key: Option<String>,
        /// Cover key currently stored on the video
        #[arg(long)]
        old_cover_key: String,
        /// Video key currently stored on the video
        #[arg(long)]
        old_video_key: String,
    },
    /// Delete a video and its blobs
    Delete { video_id: VideoId },
    /// Delete blobs left behind by a failed create or update
    Discard {
        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// Show a video with its tags
    Get { video_id: VideoId },
    /// Comment operations
    Comment {
        #[command(subcommand)]
        sub: CommentCommands,
    },
}

#[derive(Subcommand)]
enum CommentCommands {
    /// Add a comment to a video
    Add { video_id: VideoId, content: String },
    /// List a video's comments, newest first
    List { video_id: VideoId },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

/// Print the outcome as JSON and map it to an exit code.
fn finish<T: Serialize>(
    result: Result<T, AppError>,
    production: bool,
) -> anyhow::Result<ExitCode> {
    match result {
        Ok(value) => {
            print_json(&value)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            print_json(&ErrorReport::from_error(&err, production))?;
            Ok(ExitCode::FAILURE)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    init_tracing();
    let cli = Cli::parse();

    let config = Config::from_env().context("Failed to load configuration")?;
    let production = config.is_production();
    let pool = setup_database(&config).await?;

    match cli.command {
        Commands::Get { video_id } => {
            let result = VideoRepository::new(pool)
                .get_video(video_id)
                .await
                .context("Failed to load video")?
                .ok_or_else(|| AppError::NotFound(format!("Video {} not found", video_id)));
            finish(result, production)
        }
        Commands::Comment { sub } => {
            let comments = CommentRepository::new(pool);
            match sub {
                CommentCommands::Add { video_id, content } => {
                    let comment = NewComment { video_id, content };
                    if let Err(e) = comment.validate() {
                        return finish::<()>(Err(e.into()), production);
                    }
                    let result = comments
                        .add_comment(&comment)
                        .await
                        .context("Failed to add comment")?
                        .ok_or_else(|| {
                            AppError::NotFound(format!("Video {} not found", video_id))
                        });
                    finish(result, production)
                }
                CommentCommands::List { video_id } => {
                    let list = comments
                        .list_comments(video_id)
                        .await
                        .context("Failed to list comments")?;
                    print_json(&list)?;
                    Ok(ExitCode::SUCCESS)
                }
            }
        }
        Commands::Create {
            title,
            description,
            tags,
            cover_key,
            video_key,
        } => {
            let orchestrator = build_orchestrator(&config, pool).await?;
            let request = CreateVideoRequest {
                title,
                description,
                tags,
                cover_key,
                video_key,
            };
            finish(orchestrator.create(request).await, production)
        }
        Commands::Update {
            video_id,
            title,
            description,
            tags,
            new_cover_key,
            new_video_key,
            old_cover_key,
            old_video_key,
        } => {
            let orchestrator = build_orchestrator(&config, pool).await?;
            let request = UpdateVideoRequest {
                video_id,
                title,
                description,
                tags,
                new_cover_key,
                new_video_key,
                old_cover_key,
                old_video_key,
            };
            let result = orchestrator.update(request).await;
            if let Ok(updated) = &result {
                if !updated.is_cleanup_complete() {
                    tracing::warn!(video_id, "Old blobs remain; retry with `vidcat discard`");
                }
            }
            finish(result, production)
        }
        Commands::Delete { video_id } => {
            let orchestrator = build_orchestrator(&config, pool).await?;
            let result = orchestrator.delete(video_id).await;
            if let Ok(deleted) = &result {
                if !deleted.is_cleanup_complete() {
                    tracing::warn!(video_id, "Blobs remain; retry with `vidcat discard`");
                }
            }
            finish(result, production)
        }
        Commands::Discard { keys } => {
            let orchestrator = build_orchestrator(&config, pool).await?;
            let result = orchestrator
                .discard_orphans(&keys)
                .await
                .map(|deleted| serde_json::json!({ "deleted": deleted }));
            finish(result, production)
        }
    }
}

async fn build_orchestrator(
    config: &Config,
    pool: PgPool,
) -> anyhow::Result<LifecycleOrchestrator<PgCatalog>> {
    let storage = create_storage(config)
        .await
        .context("Failed to create blob storage")?;
    let compensation = CompensationExecutor::new(storage, config.blob_delete_concurrency);
    Ok(LifecycleOrchestrator::new(PgCatalog::new(pool), compensation))
}
