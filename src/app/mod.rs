pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod filters;
pub mod logger;
pub mod pipeline;
pub mod validation;
