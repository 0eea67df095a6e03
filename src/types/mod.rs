mod models;
mod slug;
mod version;

pub use models::*;
pub use slug::slugify;
pub use version::Version;
