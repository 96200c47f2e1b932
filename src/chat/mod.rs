//! Channeled chat: text and voice messages in convs, with emoji reactions.
//!
//! Two convs exist, "general" and "admin". REST reads and writes on the
//! admin conv are denied to plain members; room subscription over the socket
//! is left to the client, which only joins the convs it may read.

pub mod messages;
pub mod reactions;

/// Returns true when the caller's role may read and write the given conv.
pub fn conv_allowed(conv: &str, role: &str) -> bool {
    conv != "admin" || role != "member"
}
