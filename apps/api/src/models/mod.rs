pub mod job;
pub mod outreach;
pub mod package;
pub mod profile;
