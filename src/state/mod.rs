//! State module for tracking crawl sessions
//!
//! # Components
//!
//! - `SiteStatus`: lifecycle of a site's index (indexing, indexed, failed)
//! - `CancelToken`: cooperative stop signal shared by one crawl session

mod cancel;
mod site_status;

// Re-export main types
pub use cancel::CancelToken;
pub use site_status::SiteStatus;
