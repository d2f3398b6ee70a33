//! AgriChain gateway
//!
//! Farmer, crop and supply-chain records stored on a content-addressed
//! network, wallet-signature sign-in and heuristic crop estimates behind a
//! JSON HTTP API.

pub mod ai_services;
pub mod api;
pub mod bridges;
pub mod config;
pub mod identity;
pub mod records;
pub mod storage;

pub use config::GatewayConfig;
