use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pretty_assertions::assert_eq;

use crate::app::{parse_selection, NONE_OPTION_VALUE};
use crate::domain::entities::dataset::{Dataset, DatasetId};
use crate::domain::entities::edit::{LinkageBaseline, LinkageDelta};
use crate::domain::entities::org_unit::{OrgUnitId, OrgUnitPath, OrganisationUnit};
use crate::domain::entities::user::User;
use crate::ui::state::screen::{
    Action, Effect, NoticeLevel, Phase, ReferenceState, ScreenState, SelectionToken, Summary,
};
use crate::usecase::ports::repo::{LinkageRepository, RepoError};
use crate::usecase::services::edit_service::EditService;
use crate::usecase::services::query_service::{QueryService, ReferenceData};

fn unit(id: &str) -> OrganisationUnit {
    OrganisationUnit {
        id: OrgUnitId::from(id),
        display_name: format!("Unit {id}"),
        path: OrgUnitPath::new(format!("/root/{id}")),
        level: 2,
    }
}

fn dataset(id: &str, name: &str) -> Dataset {
    Dataset {
        id: DatasetId::from(id),
        display_name: name.to_string(),
        code: None,
    }
}

fn user() -> User {
    User {
        id: "u1".to_string(),
        name: "Admin".to_string(),
        email: Some("admin@example.org".to_string()),
        organisation_units: vec![OrganisationUnit {
            id: OrgUnitId::from("root"),
            display_name: "Kenya".to_string(),
            path: OrgUnitPath::new("/root"),
            level: 1,
        }],
    }
}

fn reference_data() -> ReferenceData {
    ReferenceData {
        user: user(),
        datasets: vec![dataset("D1", "Malaria"), dataset("D2", "Immunisation")],
    }
}

fn ready_state() -> ScreenState {
    let mut state = ScreenState::default();
    let effect = state.apply(Action::ReferenceLoaded(Ok(reference_data())));
    assert_eq!(effect, Effect::None);
    state
}

fn select(state: &mut ScreenState, id: &str) -> SelectionToken {
    match state.apply(Action::SelectDataset(Some(DatasetId::from(id)))) {
        Effect::FetchBaseline { dataset, token } => {
            assert_eq!(dataset, DatasetId::from(id));
            token
        }
        other => panic!("selection should fetch baseline, got {other:?}"),
    }
}

fn baseline_of(ids: &[&str]) -> LinkageBaseline {
    LinkageBaseline::from_units(ids.iter().map(|id| unit(id)))
}

/// Selects `id` and resolves its baseline with `linked`.
fn editing_state(id: &str, linked: &[&str]) -> ScreenState {
    let mut state = ready_state();
    let token = select(&mut state, id);
    state.apply(Action::BaselineLoaded {
        token,
        result: Ok(baseline_of(linked)),
    });
    assert!(matches!(state.phase(), Phase::Editing { .. }));
    state
}

fn toggle(state: &mut ScreenState, id: &str, checked: bool) {
    let effect = state.apply(Action::Toggle {
        id: OrgUnitId::from(id),
        checked,
    });
    assert_eq!(effect, Effect::None, "toggles never produce effects");
}

fn pending_ids(state: &ScreenState) -> (Vec<String>, Vec<String>) {
    let pending = state.pending().expect("state should hold pending edits");
    (
        pending.additions().iter().map(|id| id.0.clone()).collect(),
        pending.deletions().iter().map(|id| id.0.clone()).collect(),
    )
}

#[test]
fn reference_failure_blocks_screen() {
    let mut state = ScreenState::default();

    state.apply(Action::ReferenceLoaded(Err(RepoError::Message(
        "401 Unauthorized".to_string(),
    ))));

    assert_eq!(
        state.reference(),
        &ReferenceState::Failed("401 Unauthorized".to_string())
    );
    let effect = state.apply(Action::SelectDataset(Some(DatasetId::from("D1"))));
    assert_eq!(effect, Effect::None, "nothing is selectable without datasets");
    assert_eq!(state.phase(), &Phase::Idle);
}

#[test]
fn selecting_unknown_dataset_is_rejected() {
    let mut state = ready_state();

    let effect = state.apply(Action::SelectDataset(Some(DatasetId::from("nope"))));

    assert_eq!(effect, Effect::None);
    assert_eq!(state.phase(), &Phase::Idle);
}

#[test]
fn selection_loads_baseline_then_edits() {
    let mut state = ready_state();
    let token = select(&mut state, "D1");

    assert!(state.is_loading_baseline());
    assert_eq!(state.selected_dataset().map(|d| d.display_name.as_str()), Some("Malaria"));

    state.apply(Action::BaselineLoaded {
        token,
        result: Ok(baseline_of(&["A", "B"])),
    });

    assert_eq!(
        state.summary(),
        Summary {
            dataset_name: Some("Malaria".to_string()),
            linked: 2,
            additions: 0,
            deletions: 0,
        }
    );
    assert!(!state.save_enabled(), "nothing to save yet");
}

#[test]
fn uncheck_then_recheck_settles() {
    let mut state = editing_state("D1", &["A", "B"]);

    toggle(&mut state, "A", false);
    assert_eq!(pending_ids(&state), (vec![], vec!["A".to_string()]));
    assert!(state.save_enabled());

    toggle(&mut state, "A", true);
    assert_eq!(pending_ids(&state), (vec![], vec![]));
    assert!(!state.save_enabled(), "settled edit should disable save");
}

#[test]
fn toggle_sequences_never_overlap_and_settle_at_baseline() {
    for linked in [true, false] {
        let baseline: &[&str] = if linked { &["N", "B"] } else { &["B"] };
        // Every sequence of up to six toggle values on node N.
        for len in 1..=6u32 {
            for bits in 0..(1u32 << len) {
                let mut state = editing_state("D1", baseline);
                for step in 0..len {
                    toggle(&mut state, "N", bits & (1 << step) != 0);

                    let pending = state.pending().expect("editing state");
                    assert!(
                        pending.additions().is_disjoint(pending.deletions()),
                        "additions and deletions overlap after bits {bits:b}"
                    );
                }

                let last_checked = bits & (1 << (len - 1)) != 0;
                let pending = state.pending().expect("editing state");
                if last_checked == linked {
                    assert!(pending.is_empty(), "linked={linked} bits={bits:b} should settle");
                    assert!(!state.save_enabled());
                } else {
                    assert!(!pending.is_empty(), "linked={linked} bits={bits:b} should differ");
                    assert!(state.save_enabled());
                }
            }
        }
    }
}

#[test]
fn node_checked_reflects_baseline_and_pending() {
    let mut state = editing_state("D1", &["A", "B"]);

    assert!(state.node_checked(&unit("A")));
    assert!(!state.node_checked(&unit("C")));

    toggle(&mut state, "A", false);
    toggle(&mut state, "C", true);

    assert!(!state.node_checked(&unit("A")));
    assert!(state.node_checked(&unit("C")));
    assert!(
        state.node_has_linked_descendant(&OrganisationUnit {
            id: OrgUnitId::from("root"),
            display_name: "Kenya".to_string(),
            path: OrgUnitPath::new("/root"),
            level: 1,
        }),
        "root has linked units below it"
    );
}

#[test]
fn changing_dataset_resets_edits_and_replaces_baseline() {
    let mut state = editing_state("D1", &["A", "B"]);
    toggle(&mut state, "C", true);
    toggle(&mut state, "A", false);

    let token = select(&mut state, "D2");
    assert_eq!(state.pending(), None, "loading phase holds no edits");
    assert_eq!(state.summary().additions, 0);

    state.apply(Action::BaselineLoaded {
        token,
        result: Ok(baseline_of(&["X"])),
    });

    assert_eq!(pending_ids(&state), (vec![], vec![]));
    assert_eq!(state.baseline(), Some(&baseline_of(&["X"])));
    assert!(!state.node_checked(&unit("A")), "old baseline must be gone");
}

#[test]
fn reselecting_same_dataset_discards_edits() {
    let mut state = editing_state("D1", &["A"]);
    toggle(&mut state, "C", true);

    let token = select(&mut state, "D1");
    state.apply(Action::BaselineLoaded {
        token,
        result: Ok(baseline_of(&["A"])),
    });

    assert_eq!(pending_ids(&state), (vec![], vec![]));
}

#[test]
fn stale_baseline_response_is_dropped() {
    let mut state = ready_state();
    let d1_token = select(&mut state, "D1");
    let d2_token = select(&mut state, "D2");
    assert_ne!(d1_token, d2_token);

    state.apply(Action::BaselineLoaded {
        token: d1_token,
        result: Ok(baseline_of(&["A", "B"])),
    });

    assert!(state.is_loading_baseline(), "D1 response must not end D2 loading");
    assert_eq!(state.selected_dataset().map(|d| d.id.0.as_str()), Some("D2"));

    state.apply(Action::BaselineLoaded {
        token: d2_token,
        result: Ok(baseline_of(&["X"])),
    });
    state.apply(Action::BaselineLoaded {
        token: d1_token,
        result: Ok(baseline_of(&["A", "B"])),
    });

    assert_eq!(state.baseline(), Some(&baseline_of(&["X"])), "late D1 response ignored");
}

#[test]
fn baseline_failure_keeps_selection_and_retry_refetches() {
    let mut state = ready_state();
    let token = select(&mut state, "D1");

    state.apply(Action::BaselineLoaded {
        token,
        result: Err(RepoError::Message("timeout".to_string())),
    });

    match state.phase() {
        Phase::BaselineFailed { dataset, message } => {
            assert_eq!(dataset.id, DatasetId::from("D1"));
            assert_eq!(message, "timeout");
        }
        other => panic!("expected failed baseline, got {other:?}"),
    }
    assert!(!state.save_enabled());

    let retry = select(&mut state, "D1");
    assert!(retry != token, "retry should use a fresh token");
}

#[test]
fn clearing_selection_returns_to_idle() {
    let mut state = editing_state("D1", &["A"]);
    toggle(&mut state, "C", true);

    let effect = state.apply(Action::SelectDataset(None));

    assert_eq!(effect, Effect::None);
    assert_eq!(state.phase(), &Phase::Idle);
    assert_eq!(state.summary(), Summary::default());
}

#[test]
fn toggle_outside_editing_is_ignored() {
    let mut state = ready_state();
    select(&mut state, "D1");

    toggle(&mut state, "A", true);

    assert!(state.is_loading_baseline());
    assert_eq!(state.pending(), None);
}

#[test]
fn save_without_edits_does_nothing() {
    let mut state = editing_state("D1", &["A"]);

    let effect = state.apply(Action::SaveRequested);

    assert_eq!(effect, Effect::None);
    assert!(!state.is_saving());
}

#[test]
fn successful_save_clears_edits_and_reloads_baseline() {
    let mut state = editing_state("D1", &["A", "B"]);
    toggle(&mut state, "C", true);
    assert_eq!(pending_ids(&state), (vec!["C".to_string()], vec![]));

    let (delta, save_token) = match state.apply(Action::SaveRequested) {
        Effect::Submit {
            dataset,
            delta,
            token,
        } => {
            assert_eq!(dataset, DatasetId::from("D1"));
            (delta, token)
        }
        other => panic!("expected submit, got {other:?}"),
    };
    assert_eq!(
        delta,
        LinkageDelta {
            additions: vec![OrgUnitId::from("C")],
            deletions: vec![],
        }
    );
    assert!(state.is_saving());
    assert!(!state.save_enabled(), "save is disabled while in flight");

    let reload_token = match state.apply(Action::SaveFinished {
        dataset: DatasetId::from("D1"),
        token: save_token,
        result: Ok(()),
    }) {
        Effect::FetchBaseline { dataset, token } => {
            assert_eq!(dataset, DatasetId::from("D1"));
            token
        }
        other => panic!("expected baseline reload, got {other:?}"),
    };
    assert_eq!(
        state.notice().map(|notice| notice.level),
        Some(NoticeLevel::Info)
    );

    state.apply(Action::BaselineLoaded {
        token: reload_token,
        result: Ok(baseline_of(&["A", "B", "C"])),
    });

    assert_eq!(state.baseline(), Some(&baseline_of(&["A", "B", "C"])));
    assert_eq!(pending_ids(&state), (vec![], vec![]));
    assert!(state.node_checked(&unit("C")));
}

#[test]
fn failed_save_keeps_edits_for_retry() {
    let mut state = editing_state("D1", &["A", "B"]);
    toggle(&mut state, "C", true);
    toggle(&mut state, "A", false);

    let Effect::Submit { token, .. } = state.apply(Action::SaveRequested) else {
        panic!("expected submit");
    };
    let effect = state.apply(Action::SaveFinished {
        dataset: DatasetId::from("D1"),
        token,
        result: Err(RepoError::Message("409 Conflict".to_string())),
    });

    assert_eq!(effect, Effect::None);
    assert!(matches!(state.phase(), Phase::Editing { .. }));
    assert_eq!(
        pending_ids(&state),
        (vec!["C".to_string()], vec!["A".to_string()])
    );
    let notice = state.notice().expect("error should be surfaced");
    assert_eq!(notice.level, NoticeLevel::Error);
    assert!(notice.message.contains("409 Conflict"), "got {}", notice.message);
    assert!(state.save_enabled(), "user may retry");

    state.apply(Action::DismissNotice);
    assert_eq!(state.notice(), None);
}

#[test]
fn save_result_after_switching_dataset_only_notifies() {
    let mut state = editing_state("D1", &["A"]);
    toggle(&mut state, "C", true);
    let Effect::Submit { token, .. } = state.apply(Action::SaveRequested) else {
        panic!("expected submit");
    };
    let d2_token = select(&mut state, "D2");

    let effect = state.apply(Action::SaveFinished {
        dataset: DatasetId::from("D1"),
        token,
        result: Ok(()),
    });

    assert_eq!(effect, Effect::None, "no reload for a superseded dataset");
    assert!(state.is_loading_baseline());
    assert_eq!(state.selected_dataset().map(|d| d.id.0.as_str()), Some("D2"));
    assert_eq!(
        state.notice().map(|notice| notice.level),
        Some(NoticeLevel::Info)
    );

    state.apply(Action::BaselineLoaded {
        token: d2_token,
        result: Ok(baseline_of(&[])),
    });
    assert_eq!(pending_ids(&state), (vec![], vec![]));
}

#[test]
fn save_landing_after_reselecting_same_dataset_reloads_it() {
    let mut state = editing_state("D1", &["A", "B"]);
    toggle(&mut state, "C", true);
    let Effect::Submit { token, .. } = state.apply(Action::SaveRequested) else {
        panic!("expected submit");
    };
    let reselect_token = select(&mut state, "D1");
    state.apply(Action::BaselineLoaded {
        token: reselect_token,
        result: Ok(baseline_of(&["A", "B"])),
    });

    let reload_token = match state.apply(Action::SaveFinished {
        dataset: DatasetId::from("D1"),
        token,
        result: Ok(()),
    }) {
        Effect::FetchBaseline { dataset, token } => {
            assert_eq!(dataset, DatasetId::from("D1"));
            token
        }
        other => panic!("expected baseline reload, got {other:?}"),
    };
    assert!(state.is_loading_baseline());
    assert_ne!(reload_token, reselect_token);

    state.apply(Action::BaselineLoaded {
        token: reload_token,
        result: Ok(baseline_of(&["A", "B", "C"])),
    });
    assert!(state.node_checked(&unit("C")));
    assert_eq!(state.summary().linked, 3);
}

#[test]
fn failed_save_after_reselecting_same_dataset_only_notifies() {
    let mut state = editing_state("D1", &["A"]);
    toggle(&mut state, "C", true);
    let Effect::Submit { token, .. } = state.apply(Action::SaveRequested) else {
        panic!("expected submit");
    };
    select(&mut state, "D1");

    let effect = state.apply(Action::SaveFinished {
        dataset: DatasetId::from("D1"),
        token,
        result: Err(RepoError::Message("500".to_string())),
    });

    assert_eq!(effect, Effect::None);
    assert_eq!(
        state.notice().map(|notice| notice.level),
        Some(NoticeLevel::Error)
    );
}

#[test]
fn taking_save_notice_clears_banner() {
    let mut state = editing_state("D1", &["A"]);
    toggle(&mut state, "C", true);
    let Effect::Submit { token, .. } = state.apply(Action::SaveRequested) else {
        panic!("expected submit");
    };
    state.apply(Action::SaveFinished {
        dataset: DatasetId::from("D1"),
        token,
        result: Ok(()),
    });

    let notice = state.take_notice().expect("save should raise a notice");

    assert_eq!(notice.level, NoticeLevel::Info);
    assert_eq!(notice.message, "Changes saved successfully for Malaria");
    assert_eq!(state.notice(), None);
    assert!(state.is_loading_baseline(), "reload is unaffected");
}

#[test]
fn parse_selection_maps_placeholder_to_none() {
    assert_eq!(parse_selection(NONE_OPTION_VALUE), None);
    assert_eq!(parse_selection(""), None);
    assert_eq!(parse_selection("BfMAe6Itzgt"), Some(DatasetId::from("BfMAe6Itzgt")));
}

#[derive(Default)]
struct FakeRepo {
    datasets: Vec<Dataset>,
    links: Mutex<BTreeMap<DatasetId, Vec<OrganisationUnit>>>,
    children: BTreeMap<OrgUnitId, Vec<OrganisationUnit>>,
    submissions: Mutex<Vec<(DatasetId, LinkageDelta)>>,
    fail_with: Option<String>,
}

impl FakeRepo {
    fn check(&self) -> Result<(), RepoError> {
        match &self.fail_with {
            Some(message) => Err(RepoError::Message(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl LinkageRepository for FakeRepo {
    async fn current_user(&self) -> Result<User, RepoError> {
        self.check()?;
        Ok(user())
    }

    async fn list_datasets(&self) -> Result<Vec<Dataset>, RepoError> {
        self.check()?;
        Ok(self.datasets.clone())
    }

    async fn linked_org_units(
        &self,
        dataset: &DatasetId,
    ) -> Result<Vec<OrganisationUnit>, RepoError> {
        self.check()?;
        let links = self.links.lock().expect("links lock");
        Ok(links.get(dataset).cloned().unwrap_or_default())
    }

    async fn org_unit_children(&self, id: &OrgUnitId) -> Result<Vec<OrganisationUnit>, RepoError> {
        self.check()?;
        Ok(self.children.get(id).cloned().unwrap_or_default())
    }

    async fn submit_linkage(
        &self,
        dataset: &DatasetId,
        delta: &LinkageDelta,
    ) -> Result<(), RepoError> {
        self.check()?;
        self.submissions
            .lock()
            .expect("submissions lock")
            .push((dataset.clone(), delta.clone()));
        let mut links = self.links.lock().expect("links lock");
        let linked = links.entry(dataset.clone()).or_default();
        linked.retain(|unit| !delta.deletions.contains(&unit.id));
        for id in &delta.additions {
            if !linked.iter().any(|unit| &unit.id == id) {
                linked.push(unit(&id.0));
            }
        }
        Ok(())
    }
}

#[tokio::test]
async fn reference_data_sorts_datasets_for_selector() {
    let repo = Arc::new(FakeRepo {
        datasets: vec![dataset("b", "zinc"), dataset("a", "ANC")],
        ..FakeRepo::default()
    });
    let service = QueryService::new(repo);

    let data = service
        .load_reference_data()
        .await
        .expect("reference data should load");

    let names: Vec<&str> = data.datasets.iter().map(|d| d.display_name.as_str()).collect();
    assert_eq!(names, vec!["ANC", "zinc"]);
    assert_eq!(data.user.organisation_units.len(), 1);
    assert!(data.dataset(&DatasetId::from("a")).is_some());
}

#[tokio::test]
async fn reference_data_failure_is_reported() {
    let repo = Arc::new(FakeRepo {
        fail_with: Some("connection refused".to_string()),
        ..FakeRepo::default()
    });
    let service = QueryService::new(repo);

    let result = service.load_reference_data().await;

    assert_eq!(
        result,
        Err(RepoError::Message("connection refused".to_string()))
    );
}

#[tokio::test]
async fn children_are_sorted_by_name() {
    let root = OrgUnitId::from("root");
    let mut zulu = unit("z");
    zulu.display_name = "Zulu".to_string();
    let mut alpha = unit("a");
    alpha.display_name = "alpha".to_string();
    let repo = Arc::new(FakeRepo {
        children: BTreeMap::from([(root.clone(), vec![zulu, alpha])]),
        ..FakeRepo::default()
    });
    let service = QueryService::new(repo);

    let children = service.load_children(&root).await.expect("children should load");

    let names: Vec<&str> = children.iter().map(|c| c.display_name.as_str()).collect();
    assert_eq!(names, vec!["alpha", "Zulu"]);
}

#[tokio::test]
async fn empty_delta_is_not_submitted() {
    let repo = Arc::new(FakeRepo::default());
    let service = EditService::new(repo.clone());

    let result = service
        .save_linkage(&DatasetId::from("D1"), &LinkageDelta::default())
        .await;

    assert!(result.is_err(), "empty delta should be rejected");
    assert!(repo.submissions.lock().expect("submissions lock").is_empty());
}

#[tokio::test]
async fn save_failure_is_returned_unchanged() {
    let repo = Arc::new(FakeRepo {
        fail_with: Some("DHIS2 responded with 409 Conflict".to_string()),
        ..FakeRepo::default()
    });
    let service = EditService::new(repo);
    let delta = LinkageDelta {
        additions: vec![OrgUnitId::from("C")],
        deletions: vec![],
    };

    let result = service.save_linkage(&DatasetId::from("D1"), &delta).await;

    assert_eq!(
        result,
        Err(RepoError::Message(
            "DHIS2 responded with 409 Conflict".to_string()
        ))
    );
}

/// Drives the reducer's effects through the services against the fake repo.
#[tokio::test]
async fn add_and_save_round_trip_through_services() {
    let d1 = DatasetId::from("D1");
    let repo = Arc::new(FakeRepo {
        datasets: vec![dataset("D1", "Malaria"), dataset("D2", "Immunisation")],
        links: Mutex::new(BTreeMap::from([(d1.clone(), vec![unit("A"), unit("B")])])),
        ..FakeRepo::default()
    });
    let query = QueryService::new(repo.clone());
    let edit = EditService::new(repo.clone());
    let mut state = ScreenState::default();

    let data = query.load_reference_data().await;
    state.apply(Action::ReferenceLoaded(data));

    let Effect::FetchBaseline { dataset, token } = state.apply(Action::SelectDataset(Some(d1.clone())))
    else {
        panic!("expected fetch");
    };
    let result = query.load_baseline(&dataset).await;
    state.apply(Action::BaselineLoaded { token, result });
    assert_eq!(state.summary().linked, 2);

    toggle(&mut state, "C", true);
    toggle(&mut state, "B", false);
    toggle(&mut state, "B", true);

    let Effect::Submit {
        dataset,
        delta,
        token,
    } = state.apply(Action::SaveRequested)
    else {
        panic!("expected submit");
    };
    let result = edit.save_linkage(&dataset, &delta).await;
    let Effect::FetchBaseline { dataset, token } = state.apply(Action::SaveFinished {
        dataset,
        token,
        result,
    }) else {
        panic!("expected reload");
    };
    let result = query.load_baseline(&dataset).await;
    state.apply(Action::BaselineLoaded { token, result });

    let submissions = repo.submissions.lock().expect("submissions lock").clone();
    assert_eq!(
        submissions,
        vec![(
            d1,
            LinkageDelta {
                additions: vec![OrgUnitId::from("C")],
                deletions: vec![],
            }
        )],
        "settled toggle on B must not be sent"
    );
    assert_eq!(state.baseline(), Some(&baseline_of(&["A", "B", "C"])));
    assert!(!state.save_enabled());
}
