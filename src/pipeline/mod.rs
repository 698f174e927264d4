//! Pipeline entry points.
//!
//! - `run_send`: Scrape the word of the day and deliver it to every recipient
//! - `run_preview`: Scrape and format only

pub mod run;

pub use run::{RunSummary, check_word, fetch_word, run_preview, run_send, run_send_with};
