pub mod ai_provider;
pub mod cli;
pub mod config;
pub mod error;
pub mod filler;
pub mod matcher;
pub mod pipeline;
pub mod sources;
pub mod template;
pub mod validator;
