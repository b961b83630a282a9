pub mod ats;
pub mod handlers;
pub mod orchestrator;
pub mod prompts;
pub mod validation;

pub use orchestrator::{tailor, GeneratedPackage, Tailor};
