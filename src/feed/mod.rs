//! Community feed: admin-authored posts with likes and comments.

pub mod interactions;
pub mod posts;
