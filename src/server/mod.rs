pub mod dto;
mod namespaces;
mod packages;
mod releases;
pub mod response;
mod router;
mod suites;
mod versions;

pub use router::{AppState, create_router};
