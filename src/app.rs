use std::sync::Arc;

use anyhow::Result;
use dioxus::prelude::*;
use tracing::{error, info};

use crate::domain::entities::dataset::{filter_datasets, Dataset, DatasetId};
use crate::domain::entities::org_unit::OrganisationUnit;
use crate::domain::entities::tree::{ChildrenState, OrgUnitTree};
use crate::infra::config::settings::Settings;
use crate::infra::dhis2::client::Dhis2Client;
use crate::infra::dhis2::repo::Dhis2Repo;
use crate::platform::desktop::dialog::{show_notice, NATIVE_NOTICES};
use crate::platform::desktop::paths::default_settings_path;
use crate::ui::state::app_state::AppState;
use crate::ui::state::screen::{
    Action, Effect, Notice, NoticeLevel, Phase, ReferenceState, ScreenState, Summary,
};
use crate::usecase::ports::repo::LinkageRepository;
use crate::usecase::services::edit_service::EditService;
use crate::usecase::services::query_service::QueryService;

pub const NONE_OPTION_VALUE: &str = "__none__";

const PANEL_STYLE: &str = "border: 1px solid #ddd; border-radius: 8px; padding: 16px; background: #fff; box-shadow: 0 1px 3px rgba(0,0,0,0.08);";
const ERROR_STYLE: &str = "color: #c62828;";

#[derive(Clone)]
pub struct LinkerServices {
    pub query: Arc<QueryService>,
    pub edit: Arc<EditService>,
}

impl PartialEq for LinkerServices {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.query, &other.query) && Arc::ptr_eq(&self.edit, &other.edit)
    }
}

impl LinkerServices {
    pub fn new(repo: Arc<dyn LinkageRepository>) -> Self {
        Self {
            query: Arc::new(QueryService::new(repo.clone())),
            edit: Arc::new(EditService::new(repo)),
        }
    }

    fn from_settings() -> Result<Self> {
        let settings_path = default_settings_path().ok();
        let settings = Settings::load(settings_path.as_deref())?;
        info!(
            base_url = %settings.server.base_url,
            api_version = %settings.server.api_version,
            "connecting to DHIS2"
        );
        let client = Dhis2Client::new(&settings)?;
        Ok(Self::new(Arc::new(Dhis2Repo::new(client))))
    }
}

/// Applies actions to the screen state and runs the effects they return.
#[derive(Clone)]
struct Dispatcher {
    screen: Signal<ScreenState>,
    services: LinkerServices,
}

impl Dispatcher {
    fn send(&self, action: Action) {
        let mut screen = self.screen;
        let effect = screen.write().apply(action);
        self.run(effect);
    }

    fn run(&self, effect: Effect) {
        match effect {
            Effect::None => {}
            Effect::FetchBaseline { dataset, token } => {
                let query = self.services.query.clone();
                let dispatcher = self.clone();
                spawn(async move {
                    let result = query.load_baseline(&dataset).await;
                    if let Err(err) = &result {
                        error!(dataset = %dataset, error = %err, "loading dataset linkage failed");
                    }
                    dispatcher.send(Action::BaselineLoaded { token, result });
                });
            }
            Effect::Submit {
                dataset,
                delta,
                token,
            } => {
                let edit = self.services.edit.clone();
                let dispatcher = self.clone();
                spawn(async move {
                    let result = edit.save_linkage(&dataset, &delta).await;
                    dispatcher.send(Action::SaveFinished {
                        dataset,
                        token,
                        result,
                    });
                    if NATIVE_NOTICES {
                        let mut screen = dispatcher.screen;
                        let notice = screen.write().take_notice();
                        if let Some(notice) = notice {
                            show_notice(&notice).await;
                        }
                    }
                });
            }
        }
    }
}

/// Maps a `<select>` value back to a dataset selection.
pub fn parse_selection(value: &str) -> Option<DatasetId> {
    let value = value.trim();
    (!value.is_empty() && value != NONE_OPTION_VALUE).then(|| DatasetId::from(value))
}

fn reference_signed_in(reference: &ReferenceState) -> String {
    match reference {
        ReferenceState::Ready(data) => match &data.user.email {
            Some(email) => format!("Signed in as {} ({email})", data.user.name),
            None => format!("Signed in as {}", data.user.name),
        },
        _ => String::new(),
    }
}

#[component]
pub fn App() -> Element {
    let services = use_hook(|| {
        LinkerServices::from_settings().map_err(|err| {
            error!(error = %format!("{err:#}"), "failed to configure DHIS2 client");
            format!("{err:#}")
        })
    });

    match services {
        Ok(services) => rsx! {
            Linker { services }
        },
        Err(err) => rsx! {
            div {
                p { style: ERROR_STYLE, "Unable to start: {err}" }
            }
        },
    }
}

#[component]
fn Linker(services: LinkerServices) -> Element {
    let state = AppState::new();
    use_context_provider(|| state);
    let dispatcher = use_context_provider(|| Dispatcher {
        screen: state.screen,
        services: services.clone(),
    });

    let init_dispatcher = dispatcher.clone();
    use_hook(move || {
        let mut tree = state.tree;
        spawn(async move {
            let result = init_dispatcher.services.query.load_reference_data().await;
            match &result {
                Ok(data) => tree.set(OrgUnitTree::with_roots(data.user.tree_roots())),
                Err(err) => error!(error = %err, "loading reference data failed"),
            }
            init_dispatcher.send(Action::ReferenceLoaded(result));
        });
    });

    let (reference, notice, selected, summary, save_enabled, saving) = {
        let screen = state.screen.read();
        (
            screen.reference().clone(),
            screen.notice().cloned(),
            screen.selected_dataset().map(|dataset| dataset.id.clone()),
            screen.summary(),
            screen.save_enabled(),
            screen.is_saving(),
        )
    };
    let signed_in = reference_signed_in(&reference);
    let mut dataset_filter = state.dataset_filter;

    let dismiss_dispatcher = dispatcher.clone();
    let select_dispatcher = dispatcher.clone();
    let save_dispatcher = dispatcher.clone();

    let banner = notice.map(|notice| {
        rsx! {
            NoticeBanner {
                notice,
                on_dismiss: move |_| dismiss_dispatcher.send(Action::DismissNotice),
            }
        }
    });

    let body = match reference {
        ReferenceState::Loading => rsx! {
            p { "Loading user profile and datasets…" }
        },
        ReferenceState::Failed(message) => rsx! {
            p { style: ERROR_STYLE, "Error: {message}" }
        },
        ReferenceState::Ready(data) => rsx! {
            div {
                style: "display: grid; grid-template-columns: repeat(3, minmax(0, 1fr)); gap: 16px; align-items: start;",
                DatasetPanel {
                    datasets: data.datasets,
                    selected,
                    filter: dataset_filter(),
                    on_filter: move |value: String| dataset_filter.set(value),
                    on_select: move |selection: Option<DatasetId>| select_dispatcher.send(Action::SelectDataset(selection)),
                }
                TreePanel {}
                SummaryPanel {
                    summary,
                    save_enabled,
                    saving,
                    on_save: move |_| save_dispatcher.send(Action::SaveRequested),
                }
            }
        },
    };

    rsx! {
        div {
            style: "display: flex; flex-direction: column; gap: 16px; padding: 24px; font-family: sans-serif; background: #f7f7f7; min-height: 100vh; box-sizing: border-box;",
            div {
                style: "display: flex; justify-content: space-between; align-items: baseline;",
                h2 { style: "margin: 0;", "OU Linker" }
                span { style: "color: #666; font-size: 13px;", "{signed_in}" }
            }
            {banner}
            {body}
        }
    }
}

#[component]
fn NoticeBanner(notice: Notice, on_dismiss: EventHandler<()>) -> Element {
    let (background, color) = match notice.level {
        NoticeLevel::Info => ("#e8f5e9", "#2e7d32"),
        NoticeLevel::Error => ("#ffebee", "#c62828"),
    };
    let message = notice.message;

    rsx! {
        div {
            style: "display: flex; justify-content: space-between; align-items: center; padding: 8px 12px; border-radius: 6px; background: {background}; color: {color};",
            span { "{message}" }
            button {
                style: "border: none; background: none; cursor: pointer; color: inherit;",
                onclick: move |_| on_dismiss.call(()),
                "✕"
            }
        }
    }
}

#[component]
fn DatasetPanel(
    datasets: Vec<Dataset>,
    selected: Option<DatasetId>,
    filter: String,
    on_filter: EventHandler<String>,
    on_select: EventHandler<Option<DatasetId>>,
) -> Element {
    let visible = filter_datasets(&datasets, &filter);
    let shown = visible.len();
    let total = datasets.len();
    let selected_value = selected
        .as_ref()
        .map(|id| id.0.clone())
        .unwrap_or_else(|| NONE_OPTION_VALUE.to_string());

    // The selected dataset stays listed even when the filter hides it.
    let mut options: Vec<(String, String)> = visible
        .iter()
        .map(|dataset| (dataset.id.0.clone(), dataset.display_name.clone()))
        .collect();
    if let Some(current) = selected
        .as_ref()
        .and_then(|id| datasets.iter().find(|dataset| &dataset.id == id))
    {
        if !options.iter().any(|(value, _)| *value == current.id.0) {
            options.insert(0, (current.id.0.clone(), current.display_name.clone()));
        }
    }

    rsx! {
        div {
            style: "{PANEL_STYLE} display: flex; flex-direction: column; gap: 8px;",
            h3 { style: "margin: 0;", "Select Dataset" }
            input {
                r#type: "search",
                placeholder: "Filter by name or code",
                value: "{filter}",
                oninput: move |event| on_filter.call(event.value()),
            }
            select {
                style: "width: 100%; padding: 4px;",
                value: "{selected_value}",
                onchange: move |event| on_select.call(parse_selection(&event.value())),
                option { value: NONE_OPTION_VALUE, "Select a dataset" }
                for (value, label) in options {
                    option {
                        key: "{value}",
                        value: "{value}",
                        selected: value == selected_value,
                        "{label}"
                    }
                }
            }
            div {
                style: "display: flex; justify-content: space-between; align-items: center;",
                span { style: "color: #666; font-size: 12px;", "{shown} of {total} datasets" }
                button {
                    disabled: selected.is_none(),
                    onclick: move |_| on_select.call(None),
                    "Clear"
                }
            }
        }
    }
}

#[component]
fn TreePanel() -> Element {
    let state = use_context::<AppState>();
    let dispatcher = use_context::<Dispatcher>();
    let roots = state.tree.read().roots().to_vec();
    let phase = state.screen.read().phase().clone();

    let body = match phase {
        Phase::Idle => rsx! {
            p { style: "color: #666;", "Select a dataset to edit its organisation units." }
        },
        Phase::Loading { .. } => rsx! {
            p { "Loading linked organisation units…" }
        },
        Phase::BaselineFailed { dataset, message } => rsx! {
            p { style: ERROR_STYLE, "Error: {message}" }
            button {
                onclick: move |_| dispatcher.send(Action::SelectDataset(Some(dataset.id.clone()))),
                "Retry"
            }
        },
        Phase::Editing { .. } | Phase::Saving { .. } if roots.is_empty() => rsx! {
            p { style: "color: #666;", "No organisation units are assigned to this user." }
        },
        Phase::Editing { .. } | Phase::Saving { .. } => rsx! {
            ul {
                style: "list-style: none; padding-left: 0; margin: 0;",
                for unit in roots {
                    TreeNode { key: "{unit.id}", unit }
                }
            }
        },
    };

    rsx! {
        div {
            style: "{PANEL_STYLE} height: 400px; overflow: auto;",
            h3 { style: "margin-top: 0;", "Organisation Unit Tree" }
            {body}
        }
    }
}

#[component]
fn TreeNode(unit: OrganisationUnit) -> Element {
    let state = use_context::<AppState>();
    let dispatcher = use_context::<Dispatcher>();
    let mut tree = state.tree;

    let (checked, partial, editable) = {
        let screen = state.screen.read();
        let checked = screen.node_checked(&unit);
        (
            checked,
            !checked && screen.node_has_linked_descendant(&unit),
            matches!(screen.phase(), Phase::Editing { .. }),
        )
    };
    let (expanded, leaf, children) = {
        let tree = tree.read();
        (
            tree.is_expanded(&unit.id),
            tree.is_leaf(&unit.id),
            tree.children_state(&unit.id).clone(),
        )
    };

    let marker = if leaf {
        "·"
    } else if expanded {
        "▾"
    } else {
        "▸"
    };
    let label_style = if partial {
        "font-style: italic; color: #1565c0;"
    } else {
        ""
    };
    let name = unit.display_name.clone();
    let expand_id = unit.id.clone();
    let toggle_id = unit.id.clone();
    let query = dispatcher.services.query.clone();

    let nested = expanded.then(|| match children {
        ChildrenState::Loaded(children) => rsx! {
            ul {
                style: "list-style: none; padding-left: 20px; margin: 0;",
                for child in children {
                    TreeNode { key: "{child.id}", unit: child }
                }
            }
        },
        ChildrenState::Failed(message) => rsx! {
            p { style: "{ERROR_STYLE} margin: 2px 0 2px 24px;", "Could not load children: {message}" }
        },
        ChildrenState::Loading | ChildrenState::NotLoaded => rsx! {
            p { style: "color: #666; margin: 2px 0 2px 24px;", "Loading…" }
        },
    });

    rsx! {
        li {
            div {
                style: "display: flex; align-items: center; gap: 6px; padding: 2px 0;",
                button {
                    style: "border: none; background: none; cursor: pointer; width: 18px;",
                    disabled: leaf,
                    onclick: move |_| {
                        if tree.read().is_expanded(&expand_id) {
                            tree.write().collapse(&expand_id);
                            return;
                        }
                        let needs_fetch = tree.write().expand(&expand_id);
                        if needs_fetch {
                            let query = query.clone();
                            let id = expand_id.clone();
                            spawn(async move {
                                let result = query
                                    .load_children(&id)
                                    .await
                                    .map_err(|err| err.to_string());
                                if let Err(err) = &result {
                                    error!(org_unit = %id, error = %err, "loading children failed");
                                }
                                tree.write().children_loaded(id, result);
                            });
                        }
                    },
                    "{marker}"
                }
                input {
                    r#type: "checkbox",
                    checked: checked,
                    disabled: !editable,
                    onclick: move |_| {
                        dispatcher.send(Action::Toggle {
                            id: toggle_id.clone(),
                            checked: !checked,
                        });
                    },
                }
                span { style: "{label_style}", "{name}" }
            }
            {nested}
        }
    }
}

#[component]
fn SummaryPanel(
    summary: Summary,
    save_enabled: bool,
    saving: bool,
    on_save: EventHandler<()>,
) -> Element {
    let dataset_name = summary
        .dataset_name
        .unwrap_or_else(|| "None selected".to_string());
    let linked = summary.linked;
    let additions = summary.additions;
    let deletions = summary.deletions;
    let label = if saving { "Saving…" } else { "Save Changes" };

    rsx! {
        div {
            style: "{PANEL_STYLE} display: flex; flex-direction: column; gap: 6px;",
            h3 { style: "margin: 0 0 8px 0;", "Summary" }
            span { "Dataset: " b { "{dataset_name}" } }
            span { "Org Units Linked: " b { "{linked}" } }
            span { style: "color: #2e7d32;", "Additions: " b { "{additions}" } }
            span { style: "color: #c62828;", "Deletions: " b { "{deletions}" } }
            button {
                style: "margin-top: 12px; padding: 6px 14px; border-radius: 6px; border: 1px solid #1565c0; background: #1565c0; color: #fff; cursor: pointer;",
                disabled: !save_enabled,
                onclick: move |_| on_save.call(()),
                "{label}"
            }
        }
    }
}
