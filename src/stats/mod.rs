pub mod client;
pub mod error;
pub mod model;

pub use client::{SeasonType, StatsClient, DEFAULT_BASE_URL};
pub use error::FetchError;
pub use model::{GameLog, PlayerIndex, ResultSet};
