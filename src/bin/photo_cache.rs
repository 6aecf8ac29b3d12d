use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::{debug, info};

use profile_photo_cache::infrastructure::http::HttpPhotoGateway;
use profile_photo_cache::infrastructure::storage::FileKeyValueStore;
use profile_photo_cache::shared::logging::init_logging;
use profile_photo_cache::{
    DefaultImageValidator, PhotoCacheConfig, PhotoUpload, ProfilePhotoCache, UploadPolicy, UserId,
};

#[derive(Parser)]
#[command(name = "photo-cache")]
#[command(about = "Profile photo cache operator tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// User whose photo is managed
    #[arg(short, long, env = "PHOTO_CACHE_USER")]
    user: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", env = "LOG_LEVEL")]
    log_level: String,

    /// Enable JSON logging
    #[arg(long, env = "JSON_LOGS")]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the photo, from cache when fresh
    Show {
        /// Bypass the cached entry
        #[arg(long)]
        force: bool,
    },
    /// Upload a new photo from a local file
    Upload {
        path: PathBuf,
        /// MIME type (inferred from the extension when omitted)
        #[arg(long)]
        mime: Option<String>,
    },
    /// Delete the photo on the server and locally
    Remove,
    /// Compare the cached entry with server metadata
    Reconcile,
    /// Drop the local entry without contacting the server
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level, cli.json_logs)?;

    let config = PhotoCacheConfig::from_env();
    if let Err(reason) = config.validate() {
        bail!("invalid configuration: {reason}");
    }
    debug!(
        base_url = %config.api.base_url,
        storage_dir = %config.cache.storage_dir.display(),
        ttl_secs = config.cache.ttl_secs,
        "Loaded configuration"
    );

    let user = UserId::new(cli.user.as_str())?;
    let cache = build_cache(&config, user).await?;

    match cli.command {
        Commands::Show { force } => show(&cache, force).await?,
        Commands::Upload { path, mime } => upload(&cache, &path, mime).await?,
        Commands::Remove => {
            cache.remove().await?;
            println!("removed");
        }
        Commands::Reconcile => {
            cache.reconcile().await;
            print_state(&cache)?;
        }
        Commands::Clear => {
            cache.clear().await?;
            println!("cleared");
        }
    }

    Ok(())
}

async fn build_cache(config: &PhotoCacheConfig, user: UserId) -> Result<ProfilePhotoCache> {
    let store = FileKeyValueStore::new(config.cache.storage_dir.clone())
        .await
        .context("failed to open cache storage")?;
    let gateway = HttpPhotoGateway::from_config(&config.api)?;
    let validator = DefaultImageValidator::new(UploadPolicy::from(config.upload.clone()));

    Ok(
        ProfilePhotoCache::new(user, Arc::new(gateway), Arc::new(store))
            .with_validator(Arc::new(validator))
            .with_ttl(config.ttl()),
    )
}

async fn show(cache: &ProfilePhotoCache, force: bool) -> Result<()> {
    match cache.load(force).await? {
        Some(entry) => {
            info!(user = %cache.user(), last_updated = %entry.metadata.last_updated_at, "Loaded profile photo");
        }
        None => info!(user = %cache.user(), "User has no profile photo"),
    }
    print_state(cache)
}

async fn upload(cache: &ProfilePhotoCache, path: &Path, mime: Option<String>) -> Result<()> {
    let mime_type = match mime {
        Some(mime) => mime,
        None => mime_from_extension(path)
            .with_context(|| format!("cannot infer MIME type of {}; pass --mime", path.display()))?
            .to_string(),
    };
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let confirmed = cache
        .upload(PhotoUpload {
            file_name,
            mime_type,
            bytes,
        })
        .await?;
    println!("{}", serde_json::to_string_pretty(&confirmed)?);
    Ok(())
}

fn print_state(cache: &ProfilePhotoCache) -> Result<()> {
    let state = cache.state();
    let summary = json!({
        "user": cache.user().to_string(),
        "hasPhoto": state.photo.is_some(),
        "photoChars": state.photo.as_ref().map(String::len),
        "metadata": state.metadata,
        "error": state.error,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn mime_from_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}
