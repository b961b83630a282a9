pub mod dedup;
pub mod fingerprint;
pub mod handlers;
pub mod orchestrator;
pub mod parse;
pub mod prefilter;
pub mod prompts;
pub mod scoring;
pub mod search;

pub use orchestrator::{Discovery, DiscoveryReport, RescoreReport};
