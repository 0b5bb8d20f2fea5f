//! Command handlers

pub mod config;
pub mod migrate;
pub mod posts;
pub mod status;
pub mod transfer;
