pub mod config;
pub mod logging;

pub mod cache;
pub mod catalog;
pub mod download;
pub mod filter;
pub mod naming;
pub mod provider;
pub mod reconciler;
pub mod retry;
pub mod walker;
