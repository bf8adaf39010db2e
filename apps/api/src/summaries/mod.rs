// Daily summary pipeline: prompt → grounded generation → parse → upsert.
// All provider calls go through llm_client — nothing here talks HTTP.

pub mod handlers;
pub mod parser;
pub mod prompts;
pub mod service;
pub mod store;
pub mod upsert;
