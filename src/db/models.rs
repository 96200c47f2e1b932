//! Database row types and API response shapes.
//! Row structs correspond 1:1 to the SQLite schema in migrations.rs;
//! the serialized shapes match what the web client consumes (camelCase).

use serde::Serialize;

/// User record in the users table, minus the password hash.
/// Serialized directly in API responses.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub country: String,
    pub role: String,
    pub avatar: String,
    pub bio: String,
    pub suspended: bool,
    pub suspended_reason: String,
    pub restore_date: Option<String>,
    pub created_at: String,
}

/// Post with author info, like list, and comments joined in.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub author: Author,
    #[serde(rename = "type")]
    pub kind: String,
    pub post_type: String,
    pub title: String,
    pub content: String,
    pub media_url: String,
    pub likes: Vec<String>,
    pub comments: Vec<Comment>,
    pub created_at: String,
}

/// Author summary embedded in posts.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub id: String,
    pub name: String,
    pub avatar: String,
    pub role: String,
}

/// Comment on a post. Name and role are denormalized at write time
/// so comments survive author deletion.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub author: String,
    pub name: String,
    pub role: String,
    pub text: String,
    pub created_at: String,
}

/// Chat message in a conv ("general" or "admin").
/// Reactions map emoji -> list of user names that toggled it on.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub author: String,
    pub name: String,
    pub role: String,
    pub text: String,
    pub audio_url: String,
    pub duration: i64,
    #[serde(rename = "type")]
    pub message_type: String,
    pub conv: String,
    pub reactions: serde_json::Value,
    pub created_at: String,
}

/// Community event with the list of attending user ids and names.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub date: String,
    pub time: String,
    #[serde(rename = "lieu")]
    pub location: String,
    pub description: String,
    pub participants: Vec<Participant>,
    pub created_at: String,
}

/// Participant summary embedded in events.
#[derive(Debug, Clone, Serialize)]
pub struct Participant {
    pub id: String,
    pub name: String,
}

/// Poll with its options and per-option voter lists.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Poll {
    pub id: String,
    pub question: String,
    pub options: Vec<PollOption>,
    pub expires_at: Option<String>,
    pub closed: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PollOption {
    pub id: String,
    pub text: String,
    pub votes: Vec<String>,
}

/// Broadcast notification. `read` is computed per caller from
/// notification_reads at query time.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub message: String,
    pub url: String,
    pub read: bool,
    pub created_at: String,
}
