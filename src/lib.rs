// src/lib.rs

//! Word of the day scraper and Telegram broadcaster.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod utils;
