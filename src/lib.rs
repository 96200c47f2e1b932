//! GLORY community server library.
//! This crate exposes internal modules for integration testing.
//! The binary entry point is in main.rs.

pub mod admin;
pub mod auth;
pub mod chat;
pub mod config;
pub mod db;
pub mod events;
pub mod feed;
pub mod live;
pub mod notifications;
pub mod polls;
pub mod routes;
pub mod state;
pub mod uploads;
pub mod ws;
