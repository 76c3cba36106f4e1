use dioxus::prelude::{use_signal, Signal};

use crate::domain::entities::tree::OrgUnitTree;
use crate::ui::state::screen::ScreenState;

#[derive(Clone, Copy)]
pub struct AppState {
    pub screen: Signal<ScreenState>,
    pub tree: Signal<OrgUnitTree>,
    pub dataset_filter: Signal<String>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            screen: use_signal(ScreenState::default),
            tree: use_signal(OrgUnitTree::default),
            dataset_filter: use_signal(String::new),
        }
    }
}
