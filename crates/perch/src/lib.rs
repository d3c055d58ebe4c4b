#![doc = include_str!("../README.md")]

mod config;
pub mod listing;
pub mod paginate;
mod permalink;
pub mod render;
pub mod taxonomy;
pub mod text;

pub use config::*;
pub use permalink::*;
