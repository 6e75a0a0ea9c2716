//! Loads a namedict workspace and prints its restored state.
//!
//! Usage: `namedict <workspace> [--select <category>=<value>]... [--upload | --download]`

use std::path::PathBuf;
use std::sync::Arc;

use dictionary::IndexCategory;
use namedict::config::load_or_create_config;
use namedict::coordinator::BlockingFilterCalculator;
use namedict::loader::FileLoader;
use namedict::secure::FileSecureStore;
use namedict::storage::FileStorage;
use namedict::sync::WebDavClient;
use namedict::{CoordinatorDeps, CoreError, CoreResult, LoadState, StateCoordinator, StoragePrefs};

const SECRET_FILE_NAME: &str = "sync-secret";

enum SyncRequest {
    Upload,
    Download,
}

struct Args {
    workspace: PathBuf,
    selections: Vec<(IndexCategory, String)>,
    sync: Option<SyncRequest>,
}

fn parse_args() -> CoreResult<Args> {
    let mut args = std::env::args().skip(1);
    let workspace = args
        .next()
        .map(PathBuf::from)
        .ok_or_else(|| CoreError::InvalidInput("missing workspace directory".to_string()))?;
    let mut selections = Vec::new();
    let mut sync = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--upload" => sync = Some(SyncRequest::Upload),
            "--download" => sync = Some(SyncRequest::Download),
            "--select" => {
                let pair = args.next().unwrap_or_default();
                let (key, value) = pair.split_once('=').ok_or_else(|| {
                    CoreError::InvalidInput(format!("expected <category>=<value>, got {pair:?}"))
                })?;
                let category = IndexCategory::from_key(key).ok_or_else(|| {
                    CoreError::InvalidInput(format!("unknown category {key:?}"))
                })?;
                selections.push((category, value.to_string()));
            }
            other => {
                return Err(CoreError::InvalidInput(format!("unknown argument {other:?}")));
            }
        }
    }
    Ok(Args {
        workspace,
        selections,
        sync,
    })
}

async fn run(args: Args) -> CoreResult<()> {
    let config = load_or_create_config(&args.workspace)?;
    let storage = Arc::new(FileStorage::new(args.workspace.join("storage")));
    let secrets = Arc::new(FileSecureStore::new(args.workspace.join(SECRET_FILE_NAME)));
    let deps = CoordinatorDeps {
        loader: Arc::new(FileLoader::new(config.resolve_data_dir(&args.workspace))),
        prefs: Arc::new(StoragePrefs::new(storage, secrets)),
        sync_client: Arc::new(WebDavClient::new(config.http_timeout())?),
        calculator: Arc::new(BlockingFilterCalculator),
    };
    let coordinator = StateCoordinator::new(deps, config.coordinator_settings())?;

    coordinator.load().await;
    if let LoadState::Failed(message) = coordinator.snapshot().load_state {
        return Err(CoreError::Load(message));
    }

    for (category, value) in &args.selections {
        if let Some(handle) = coordinator.toggle_value(*category, value) {
            handle
                .await
                .map_err(|error| CoreError::Internal(format!("filter task failed: {error}")))?;
        }
    }

    let handle = match args.sync {
        Some(SyncRequest::Upload) => coordinator.manual_upload(),
        Some(SyncRequest::Download) => coordinator.manual_download(),
        None => None,
    };
    if let Some(handle) = handle {
        handle
            .await
            .map_err(|error| CoreError::Internal(format!("sync task failed: {error}")))?;
    }
    coordinator.flush().await;

    let snapshot = coordinator.snapshot();
    println!("Category: {}", snapshot.selected_category);
    println!("Matching characters: {}", snapshot.filtered.len());
    let preview: String = snapshot
        .filtered
        .entries
        .iter()
        .take(40)
        .map(|entry| entry.char.as_str())
        .collect();
    if !preview.is_empty() {
        println!("  {preview}");
    }
    println!("Favorites: {}", snapshot.favorite_order.len());
    if !snapshot.naming.surname.is_empty() || !snapshot.naming.schemes.is_empty() {
        println!(
            "Name plans: {} ({} schemes)",
            snapshot.naming.surname,
            snapshot.naming.schemes.len()
        );
    }
    if let Some(message) = snapshot.last_sync_message {
        println!("Sync: {message}");
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}");
            eprintln!(
                "usage: namedict <workspace> [--select <category>=<value>]... [--upload | --download]"
            );
            std::process::exit(2);
        }
    };
    if let Err(e) = run(args).await {
        eprintln!("namedict: {e}");
        std::process::exit(1);
    }
}
