pub mod error;

pub use error::{AppError, FailureKind, PageError, Result, ScrapeError};
