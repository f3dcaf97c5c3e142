//! biomind: query orchestration for a bioinformatics research assistant.
//!
//! A query is classified, checked against the caller's subscription tier and
//! then answered either by the deterministic [`analysis`] algorithms or by a
//! generative backend chosen through the [`providers::ProviderRouter`]
//! fallback chain. Conversation history lives in [`session`].

pub mod access;
pub mod analysis;
pub mod classifier;
pub mod config;
pub mod orchestrator;
pub mod providers;
pub mod search;
pub mod session;
pub mod utils;
