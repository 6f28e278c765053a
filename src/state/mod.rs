//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlStatus`: Lifecycle of a crawl session (pending, running, paused, terminal states)
//! - `PageRecord`: The immutable outcome recorded for each crawled URL

mod crawl_status;
mod page_record;

// Re-export main types
pub use crawl_status::CrawlStatus;
pub use page_record::{compress_content, PageRecord};
