pub mod atcoder;
pub mod dispatch;
mod error;
pub mod source;

pub use error::{Result, ScrapeError};
