pub mod cli;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod processors;
pub mod readers;
pub mod settings;
pub mod utils;
pub mod warehouse;
pub mod writers;

pub use error::{ProcessingError, Result};
