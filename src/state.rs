//! Explicit page routing.
//!
//! The original UI kept the current page and selected device in ambient
//! session state; here routing is a value plus a pure transition function.

use crate::services::catalog::normalize_bim_key;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub enum Page {
    #[default]
    Home,
    /// Detail view for one device, by normalized key.
    Bim(String),
    /// Route plan over a selection of devices, by normalized keys.
    Route(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    OpenHome,
    OpenBim(String),
    PlanRoute(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct RequestState {
    pub page: Page,
}

/// Pure routing step. Device keys are normalized on the way in; actions
/// that would land on an empty selection fall back to the home page.
/// Every action names its target page in full, so the previous state only
/// matters as the fallback the caller keeps when no action arrives.
pub fn transition(_state: &RequestState, action: Action) -> RequestState {
    let page = match action {
        Action::OpenHome => Page::Home,
        Action::OpenBim(raw) => {
            let key = normalize_bim_key(Some(&raw));
            if key.is_empty() { Page::Home } else { Page::Bim(key) }
        }
        Action::PlanRoute(raw_keys) => {
            let mut keys: Vec<String> = Vec::new();
            for raw in raw_keys {
                let key = normalize_bim_key(Some(&raw));
                if !key.is_empty() && !keys.contains(&key) {
                    keys.push(key);
                }
            }
            if keys.is_empty() { Page::Home } else { Page::Route(keys) }
        }
    };
    RequestState { page }
}
