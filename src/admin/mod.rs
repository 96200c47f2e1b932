//! Administration surface: member management and live session control.

pub mod live;
pub mod users;
