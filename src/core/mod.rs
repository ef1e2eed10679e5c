pub mod agent;
pub mod config;
pub mod credentials;
pub mod error;
pub mod lifecycle;
pub mod llm;
pub mod orchestrator;
pub mod prompt;
pub mod proposals;
pub mod sources;
pub mod store;
pub mod terminal;
