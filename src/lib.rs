//! # MunaLuna Tracker Bot
//!
//! A Telegram bot for tracking daily acts of worship per user.
//!
//! ## Features
//! - Mark the five daily prayers, dhikr and Quran reading as done
//! - Daily status with completion percentage
//! - Per-user notification and cycle settings with canonical defaults
//! - Menstrual cycle phases planned from those settings, correctable per day
//! - SQLite or in-memory storage behind one `TrackerStore` trait

/// Bot command parsing, dispatching and reply rendering
pub mod bot;
/// Configuration management and environment variables
pub mod config;
/// Database models, connections, and migrations
pub mod database;
/// Storage and tracker error types
pub mod error;
/// Background services like the health endpoint
pub mod services;
/// Per-user tracking store and its engines
pub mod store;
/// Utility functions for dates, validation, logging and formatting
pub mod utils;
