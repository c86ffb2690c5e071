pub mod cache;
pub mod clock;
pub mod config;
pub mod deliverable;
pub mod error;
pub mod feedback;
pub mod io;
pub mod milestone;
pub mod notify;
pub mod paths;
pub mod permission;
pub mod revision;
pub mod team;
pub mod types;
pub mod workflow;

pub use error::{Result, SentinelError};
