pub mod bootstrap;
pub mod config;
pub mod handler;
pub mod llm;
pub mod logging;
pub mod outbound;
pub mod prompts;
pub mod server;
pub mod service;
