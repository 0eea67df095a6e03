//! # Depot
//!
//! A versioned artifact registry server, usable both as a standalone
//! binary and as a library.
//!
//! Packages live in namespaces, each version carries an uploaded artifact
//! in blob storage, suites group packages, and releases pin one version
//! per package. Scheduled releases make "the current release" a pure
//! function of the clock.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use depot::server::{AppState, create_router};
//! use depot::storage::{FsStore, Storage, StorageDefaults};
//! use depot::store::SqliteStore;
//!
//! let store = SqliteStore::new("./data/depot.db").unwrap();
//! store.initialize().unwrap();
//!
//! let mut storage = Storage::new(StorageDefaults {
//!     service: "s3".to_string(),
//!     location: "us-west-1".to_string(),
//!     bucket: "packages".to_string(),
//! });
//! storage.register("s3", Arc::new(FsStore::new("./data/blobs".as_ref())));
//!
//! let state = Arc::new(AppState {
//!     store: Arc::new(store),
//!     storage: Arc::new(storage),
//! });
//! let router = create_router(state);
//! // Serve with axum...
//! ```

pub mod config;
pub mod error;
pub mod server;
pub mod storage;
pub mod store;
pub mod types;
