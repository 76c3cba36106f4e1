//! Screen state of the linker and the transitions between its phases.
//!
//! All updates go through [`ScreenState::apply`], which returns the side
//! effect the caller has to run (a baseline fetch or a save request). Results
//! of those effects come back as actions tagged with the [`SelectionToken`]
//! they were issued under; results for a superseded token are dropped.

use tracing::{debug, info, warn};

use crate::domain::entities::dataset::{Dataset, DatasetId};
use crate::domain::entities::edit::{is_checked, LinkageBaseline, LinkageDelta, PendingEdit};
use crate::domain::entities::org_unit::{OrgUnitId, OrganisationUnit};
use crate::usecase::ports::repo::RepoError;
use crate::usecase::services::query_service::ReferenceData;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SelectionToken(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceState {
    Loading,
    Ready(ReferenceData),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loading {
        dataset: Dataset,
        token: SelectionToken,
    },
    Editing {
        dataset: Dataset,
        baseline: LinkageBaseline,
        pending: PendingEdit,
    },
    Saving {
        dataset: Dataset,
        baseline: LinkageBaseline,
        pending: PendingEdit,
        token: SelectionToken,
    },
    BaselineFailed {
        dataset: Dataset,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    ReferenceLoaded(Result<ReferenceData, RepoError>),
    SelectDataset(Option<DatasetId>),
    BaselineLoaded {
        token: SelectionToken,
        result: Result<LinkageBaseline, RepoError>,
    },
    Toggle {
        id: OrgUnitId,
        checked: bool,
    },
    SaveRequested,
    SaveFinished {
        dataset: DatasetId,
        token: SelectionToken,
        result: Result<(), RepoError>,
    },
    DismissNotice,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    None,
    FetchBaseline {
        dataset: DatasetId,
        token: SelectionToken,
    },
    Submit {
        dataset: DatasetId,
        delta: LinkageDelta,
        token: SelectionToken,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Figures shown in the summary panel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub dataset_name: Option<String>,
    pub linked: usize,
    pub additions: usize,
    pub deletions: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenState {
    reference: ReferenceState,
    phase: Phase,
    last_token: u64,
    notice: Option<Notice>,
}

impl Default for ScreenState {
    fn default() -> Self {
        Self {
            reference: ReferenceState::Loading,
            phase: Phase::Idle,
            last_token: 0,
            notice: None,
        }
    }
}

impl ScreenState {
    pub fn reference(&self) -> &ReferenceState {
        &self.reference
    }

    pub fn reference_data(&self) -> Option<&ReferenceData> {
        match &self.reference {
            ReferenceState::Ready(data) => Some(data),
            _ => None,
        }
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Removes the current notice so it can be shown elsewhere.
    pub fn take_notice(&mut self) -> Option<Notice> {
        self.notice.take()
    }

    pub fn selected_dataset(&self) -> Option<&Dataset> {
        match &self.phase {
            Phase::Idle => None,
            Phase::Loading { dataset, .. }
            | Phase::Editing { dataset, .. }
            | Phase::Saving { dataset, .. }
            | Phase::BaselineFailed { dataset, .. } => Some(dataset),
        }
    }

    pub fn baseline(&self) -> Option<&LinkageBaseline> {
        match &self.phase {
            Phase::Editing { baseline, .. } | Phase::Saving { baseline, .. } => Some(baseline),
            _ => None,
        }
    }

    pub fn pending(&self) -> Option<&PendingEdit> {
        match &self.phase {
            Phase::Editing { pending, .. } | Phase::Saving { pending, .. } => Some(pending),
            _ => None,
        }
    }

    pub fn is_saving(&self) -> bool {
        matches!(self.phase, Phase::Saving { .. })
    }

    pub fn is_loading_baseline(&self) -> bool {
        matches!(self.phase, Phase::Loading { .. })
    }

    pub fn save_enabled(&self) -> bool {
        match &self.phase {
            Phase::Editing { pending, .. } => !pending.is_empty(),
            _ => false,
        }
    }

    /// Checked state of `unit` against the current baseline and edits.
    pub fn node_checked(&self, unit: &OrganisationUnit) -> bool {
        match (self.baseline(), self.pending()) {
            (Some(baseline), Some(pending)) => is_checked(baseline, pending, unit),
            _ => false,
        }
    }

    pub fn node_has_linked_descendant(&self, unit: &OrganisationUnit) -> bool {
        self.baseline()
            .is_some_and(|baseline| baseline.has_linked_descendant(&unit.path))
    }

    pub fn summary(&self) -> Summary {
        Summary {
            dataset_name: self.selected_dataset().map(|d| d.display_name.clone()),
            linked: self.baseline().map_or(0, LinkageBaseline::len),
            additions: self.pending().map_or(0, |p| p.additions().len()),
            deletions: self.pending().map_or(0, |p| p.deletions().len()),
        }
    }

    pub fn apply(&mut self, action: Action) -> Effect {
        match action {
            Action::ReferenceLoaded(result) => {
                self.reference = match result {
                    Ok(data) => ReferenceState::Ready(data),
                    Err(err) => ReferenceState::Failed(err.to_string()),
                };
                Effect::None
            }
            Action::SelectDataset(None) => {
                self.phase = Phase::Idle;
                Effect::None
            }
            Action::SelectDataset(Some(id)) => self.select(id),
            Action::BaselineLoaded { token, result } => {
                self.baseline_loaded(token, result);
                Effect::None
            }
            Action::Toggle { id, checked } => {
                match &mut self.phase {
                    Phase::Editing {
                        baseline, pending, ..
                    } => pending.toggle(baseline, id, checked),
                    _ => warn!(org_unit = %id, "ignoring toggle outside editing"),
                }
                Effect::None
            }
            Action::SaveRequested => self.start_save(),
            Action::SaveFinished {
                dataset,
                token,
                result,
            } => self.save_finished(dataset, token, result),
            Action::DismissNotice => {
                self.notice = None;
                Effect::None
            }
        }
    }

    fn next_token(&mut self) -> SelectionToken {
        self.last_token += 1;
        SelectionToken(self.last_token)
    }

    fn select(&mut self, id: DatasetId) -> Effect {
        let Some(dataset) = self
            .reference_data()
            .and_then(|data| data.dataset(&id))
            .cloned()
        else {
            warn!(dataset = %id, "ignoring selection of unknown dataset");
            return Effect::None;
        };

        let token = self.next_token();
        info!(dataset = %dataset.id, name = %dataset.display_name, "dataset selected");
        self.phase = Phase::Loading { dataset, token };
        Effect::FetchBaseline { dataset: id, token }
    }

    fn baseline_loaded(&mut self, token: SelectionToken, result: Result<LinkageBaseline, RepoError>) {
        let dataset = match &self.phase {
            Phase::Loading {
                dataset,
                token: active,
            } if *active == token => dataset.clone(),
            _ => {
                debug!(?token, "dropping stale baseline response");
                return;
            }
        };

        self.phase = match result {
            Ok(baseline) => Phase::Editing {
                dataset,
                baseline,
                pending: PendingEdit::default(),
            },
            Err(err) => Phase::BaselineFailed {
                dataset,
                message: err.to_string(),
            },
        };
    }

    fn start_save(&mut self) -> Effect {
        if !self.save_enabled() {
            warn!("ignoring save request with nothing to save");
            return Effect::None;
        }
        let token = self.next_token();
        let Phase::Editing {
            dataset,
            baseline,
            pending,
        } = std::mem::replace(&mut self.phase, Phase::Idle)
        else {
            return Effect::None;
        };

        let effect = Effect::Submit {
            dataset: dataset.id.clone(),
            delta: pending.to_delta(),
            token,
        };
        self.phase = Phase::Saving {
            dataset,
            baseline,
            pending,
            token,
        };
        effect
    }

    fn save_finished(
        &mut self,
        saved: DatasetId,
        token: SelectionToken,
        result: Result<(), RepoError>,
    ) -> Effect {
        let is_current = matches!(&self.phase, Phase::Saving { token: active, .. } if *active == token);
        if !is_current {
            debug!(?token, dataset = %saved, "save finished after selection changed");
            let saved_ok = result.is_ok();
            self.notice = Some(match result {
                Ok(()) => Notice::info("Changes saved successfully"),
                Err(err) => Notice::error(format!("Error saving changes: {err}")),
            });
            return if saved_ok {
                self.reload_after_stale_save(&saved)
            } else {
                Effect::None
            };
        }

        let Phase::Saving {
            dataset,
            baseline,
            pending,
            ..
        } = std::mem::replace(&mut self.phase, Phase::Idle)
        else {
            return Effect::None;
        };

        match result {
            Ok(()) => {
                self.notice = Some(Notice::info(format!(
                    "Changes saved successfully for {}",
                    dataset.display_name
                )));
                let token = self.next_token();
                let id = dataset.id.clone();
                self.phase = Phase::Loading { dataset, token };
                Effect::FetchBaseline { dataset: id, token }
            }
            Err(err) => {
                self.notice = Some(Notice::error(format!("Error saving changes: {err}")));
                self.phase = Phase::Editing {
                    dataset,
                    baseline,
                    pending,
                };
                Effect::None
            }
        }
    }

    /// Baselines fetched while the write was in flight may predate it, so a
    /// still-selected dataset is fetched again. A newer save in flight
    /// reloads on its own.
    fn reload_after_stale_save(&mut self, saved: &DatasetId) -> Effect {
        if matches!(self.phase, Phase::Saving { .. }) {
            return Effect::None;
        }
        let Some(dataset) = self
            .selected_dataset()
            .filter(|dataset| &dataset.id == saved)
            .cloned()
        else {
            return Effect::None;
        };

        let token = self.next_token();
        let id = dataset.id.clone();
        info!(dataset = %id, "reloading linkage after save");
        self.phase = Phase::Loading { dataset, token };
        Effect::FetchBaseline { dataset: id, token }
    }
}
