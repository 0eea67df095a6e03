mod server;
mod storage;

pub use server::ServerConfig;
pub use storage::StorageConfig;
