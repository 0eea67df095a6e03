use std::fs;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use depot::config::{ServerConfig, StorageConfig};
use depot::server::{AppState, create_router};
use depot::storage::{FsStore, S3Credentials, S3Store, Storage};
use depot::store::{SqliteStore, Store};

#[derive(Parser)]
#[command(name = "depot")]
#[command(about = "A versioned artifact registry server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(long, short, default_value = "8080")]
        port: u16,

        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Serve blobs from this directory instead of S3 (development
        /// and tests)
        #[arg(long)]
        storage_root: Option<String>,

        /// Default storage location (S3 region)
        #[arg(long, default_value = "us-west-1")]
        storage_location: String,

        /// Default bucket for uploaded artifacts
        #[arg(long, default_value = "packages")]
        storage_bucket: String,

        /// Custom S3 endpoint for S3-compatible stores
        #[arg(long)]
        s3_endpoint: Option<String>,
    },
}

fn build_storage(config: &StorageConfig) -> anyhow::Result<Storage> {
    let mut storage = Storage::new(config.defaults());

    match &config.storage_root {
        Some(root) => {
            fs::create_dir_all(root)?;
            storage.register("s3", Arc::new(FsStore::new(root)));
        }
        None => {
            let credentials = S3Credentials::from_env()?;
            storage.register(
                "s3",
                Arc::new(S3Store::new(credentials, config.s3_endpoint.clone())),
            );
        }
    }

    Ok(storage)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("depot=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            host,
            port,
            data_dir,
            storage_root,
            storage_location,
            storage_bucket,
            s3_endpoint,
        } => {
            let config = ServerConfig {
                host,
                port,
                data_dir: data_dir.into(),
            };
            let storage_config = StorageConfig {
                location: storage_location,
                bucket: storage_bucket,
                storage_root: storage_root.map(Into::into),
                s3_endpoint,
            };

            fs::create_dir_all(&config.data_dir)?;
            let store = SqliteStore::new(config.db_path())?;
            store.initialize()?;

            let storage = build_storage(&storage_config)?;
            let default_bucket = format!(
                "s3://{}/{}",
                storage_config.location, storage_config.bucket
            );
            storage.bucket(&default_bucket)?.create_if_absent().await?;
            info!("Default artifact bucket is {}", default_bucket);

            let state = Arc::new(AppState {
                store: Arc::new(store),
                storage: Arc::new(storage),
            });

            let app = create_router(state);
            let addr = config.socket_addr()?;

            info!("Starting server on {}", addr);

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
