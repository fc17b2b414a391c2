pub mod db;
pub mod listing;
pub mod models;
pub mod procedures;
pub mod schema;
pub mod shortlists;

mod error;

pub use error::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;
