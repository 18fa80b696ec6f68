pub mod config;
pub mod repository;
pub mod sink;

pub use config::DatabaseConfig;
pub use repository::ListingRepository;
pub use sink::PostgresSink;
