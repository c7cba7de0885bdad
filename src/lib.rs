mod database {
    pub mod actions;
    pub mod error;
    pub mod form;
    pub mod memory;
    pub mod pagination;
    pub mod postgres;
    pub mod schema;
    pub mod store;
}
mod authentication {
    pub mod permissions;
    pub mod session;
}
mod config;
mod constants;

mod cache {
    pub mod cache;
}

pub use authentication::*;
pub use cache::cache::*;
pub use config::*;
pub use constants::*;
pub use database::*;
pub use error::{Error, ValidationKind};
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use schema::*;
pub use session::{SessionData, Viewer};
pub use store::RecipeStore;
