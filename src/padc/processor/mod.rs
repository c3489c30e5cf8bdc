pub mod aggregate;
pub mod boundary;
pub mod catalog;
pub mod consolidate;
pub mod detect;
pub mod error;
pub mod extract;
pub mod grid;
pub mod io;
pub mod pipeline;
pub mod profile;
pub mod progress;
pub mod report;
pub mod store;

pub use error::{ProcessorError, Result};
