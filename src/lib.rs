pub mod changelog;
pub mod cli;
pub mod clients;
pub mod config;
pub mod domain;
pub mod error;
pub mod export;
pub mod identity;
pub mod normalize;
pub mod ports;
pub mod session;
pub mod utils;
pub mod validation;
