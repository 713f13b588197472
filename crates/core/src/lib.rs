//! Core of the scraped-record ETL pipeline: domain types, ports, the cleaner
//! and the orchestrating service. Adapters live in sibling crates.

pub mod application;
pub mod cleaner;
pub mod config;
pub mod domain;
pub mod error;
pub mod memory;
pub mod ports;
pub mod utils;

pub use application::{PipelineService, Stage};
pub use config::{PipelineConfig, TimestampPolicy};
pub use error::{EtlError, Result};
