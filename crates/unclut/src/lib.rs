//! Unsubscribe from promotional Gmail senders and delete what they sent.

pub mod actions;
pub mod cleaner;
pub mod config;
pub mod db;
pub mod error;
pub mod extractor;
pub mod gmail_client;
pub mod readiness;
pub mod scanner;
pub mod schema;
pub mod selection;
pub mod ui;
pub mod unsubscriber;
