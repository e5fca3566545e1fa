// Library root: re-exports all modules so integration tests and the binary
// can reach the crate's public API.

pub mod agent;
pub mod config;
pub mod draft;
pub mod llm;
pub mod orchestrator;
pub mod protocol;
