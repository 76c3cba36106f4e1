use std::collections::{BTreeMap, BTreeSet};

use crate::domain::entities::org_unit::{OrgUnitId, OrgUnitPath, OrganisationUnit};

/// Server-confirmed linkage of one dataset, keyed by unit id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkageBaseline {
    units: BTreeMap<OrgUnitId, OrgUnitPath>,
    paths: BTreeSet<OrgUnitPath>,
}

impl LinkageBaseline {
    pub fn from_units(units: impl IntoIterator<Item = OrganisationUnit>) -> Self {
        let mut baseline = LinkageBaseline::default();
        for unit in units {
            baseline.paths.insert(unit.path.clone());
            baseline.units.insert(unit.id, unit.path);
        }
        baseline
    }

    pub fn contains_id(&self, id: &OrgUnitId) -> bool {
        self.units.contains_key(id)
    }

    pub fn contains_path(&self, path: &OrgUnitPath) -> bool {
        self.paths.contains(path)
    }

    /// Membership by path, falling back to the id for units whose path is
    /// unknown or differs from the linked one.
    pub fn contains_unit(&self, unit: &OrganisationUnit) -> bool {
        self.contains_path(&unit.path) || self.contains_id(&unit.id)
    }

    /// True when some linked unit lies strictly below `path`.
    pub fn has_linked_descendant(&self, path: &OrgUnitPath) -> bool {
        self.paths
            .range(path.clone()..)
            .skip_while(|linked| *linked == path)
            .take_while(|linked| linked.as_str().starts_with(path.as_str()))
            .any(|linked| path.is_ancestor_of(linked))
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }
}

/// Unsaved additions and deletions relative to a [`LinkageBaseline`].
///
/// An id is never in both sets, and an edit that returns a unit to its
/// baseline state is dropped rather than recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingEdit {
    additions: BTreeSet<OrgUnitId>,
    deletions: BTreeSet<OrgUnitId>,
}

impl PendingEdit {
    pub fn toggle(&mut self, baseline: &LinkageBaseline, id: OrgUnitId, checked: bool) {
        let linked = baseline.contains_id(&id);
        if checked {
            self.deletions.remove(&id);
            if !linked {
                self.additions.insert(id);
            }
        } else {
            self.additions.remove(&id);
            if linked {
                self.deletions.insert(id);
            }
        }
    }

    /// Pending checked state for `id`, or `None` when it follows the baseline.
    pub fn override_for(&self, id: &OrgUnitId) -> Option<bool> {
        if self.additions.contains(id) {
            Some(true)
        } else if self.deletions.contains(id) {
            Some(false)
        } else {
            None
        }
    }

    pub fn additions(&self) -> &BTreeSet<OrgUnitId> {
        &self.additions
    }

    pub fn deletions(&self) -> &BTreeSet<OrgUnitId> {
        &self.deletions
    }

    pub fn is_empty(&self) -> bool {
        self.additions.is_empty() && self.deletions.is_empty()
    }

    pub fn to_delta(&self) -> LinkageDelta {
        LinkageDelta {
            additions: self.additions.iter().cloned().collect(),
            deletions: self.deletions.iter().cloned().collect(),
        }
    }
}

/// Submitted form of a [`PendingEdit`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkageDelta {
    pub additions: Vec<OrgUnitId>,
    pub deletions: Vec<OrgUnitId>,
}

impl LinkageDelta {
    pub fn is_empty(&self) -> bool {
        self.additions.is_empty() && self.deletions.is_empty()
    }
}

pub fn is_checked(
    baseline: &LinkageBaseline,
    pending: &PendingEdit,
    unit: &OrganisationUnit,
) -> bool {
    pending
        .override_for(&unit.id)
        .unwrap_or_else(|| baseline.contains_unit(unit))
}
