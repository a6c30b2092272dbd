//! snapflow: scripted capture runs against a single-page web application,
//! plus the BibTeX-to-page converter used by the companion site.

pub mod cli;
pub mod config;
pub mod scenarios;

pub use config::Config;
