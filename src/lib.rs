pub mod bio_archive;
pub mod gamelog_archive;
pub mod progress;
pub mod retry;
pub mod roster;
pub mod runner;
pub mod stats;
