use std::sync::Arc;

use crate::config::Config;
use crate::discovery::search::JobSearch;
use crate::discovery::Discovery;
use crate::llm_client::GenerationGate;
use crate::models::profile::{BaseProfile, PreferenceProfile};
use crate::outreach::Outreach;
use crate::store::Store;
use crate::tailoring::Tailor;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    /// Every model call goes through this gate (bounded parallelism + timeout).
    pub gate: Arc<GenerationGate>,
    /// `None` when no search API key is configured.
    pub search: Option<Arc<dyn JobSearch>>,
    pub preferences: Arc<PreferenceProfile>,
    pub base_profile: Arc<BaseProfile>,
    pub config: Config,
}

impl AppState {
    pub fn discovery(&self) -> Discovery {
        Discovery::new(
            self.store.clone(),
            self.gate.clone(),
            self.preferences.clone(),
        )
    }

    pub fn tailor(&self) -> Tailor {
        Tailor::new(
            self.store.clone(),
            self.gate.clone(),
            self.base_profile.clone(),
        )
    }

    pub fn outreach(&self) -> Outreach {
        Outreach::new(
            self.store.clone(),
            self.gate.clone(),
            self.base_profile.clone(),
        )
    }
}
