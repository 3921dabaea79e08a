pub mod clock;
pub mod db;
pub mod error;
pub mod migrate;
pub mod model;
pub mod ops;
pub mod output;
pub mod paths;
pub mod schedule;
pub mod timefmt;

pub use error::{Error, Result};
