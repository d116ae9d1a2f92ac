//! Heat agent: periodic shard temperature evaluation behind an HTTP API

pub mod api;
pub mod config;
