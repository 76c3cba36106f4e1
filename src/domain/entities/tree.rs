use std::collections::{BTreeSet, HashMap};

use crate::domain::entities::org_unit::{sort_by_name, OrgUnitId, OrganisationUnit};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChildrenState {
    NotLoaded,
    Loading,
    Loaded(Vec<OrganisationUnit>),
    Failed(String),
}

static NOT_LOADED: ChildrenState = ChildrenState::NotLoaded;

/// Lazily populated organisation-unit hierarchy shown in the tree panel.
///
/// Children are fetched once per node and kept for the lifetime of the screen;
/// they do not depend on which dataset is selected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrgUnitTree {
    roots: Vec<OrganisationUnit>,
    children: HashMap<OrgUnitId, ChildrenState>,
    expanded: BTreeSet<OrgUnitId>,
}

impl OrgUnitTree {
    pub fn with_roots(mut roots: Vec<OrganisationUnit>) -> Self {
        sort_by_name(&mut roots);
        Self {
            roots,
            ..Self::default()
        }
    }

    pub fn roots(&self) -> &[OrganisationUnit] {
        &self.roots
    }

    pub fn children_state(&self, id: &OrgUnitId) -> &ChildrenState {
        self.children.get(id).unwrap_or(&NOT_LOADED)
    }

    pub fn is_expanded(&self, id: &OrgUnitId) -> bool {
        self.expanded.contains(id)
    }

    /// A node is a leaf once its children have loaded empty.
    pub fn is_leaf(&self, id: &OrgUnitId) -> bool {
        matches!(self.children_state(id), ChildrenState::Loaded(children) if children.is_empty())
    }

    /// Expands `id` and reports whether its children still need fetching.
    /// A previously failed load is retried.
    pub fn expand(&mut self, id: &OrgUnitId) -> bool {
        self.expanded.insert(id.clone());
        let needs_fetch = matches!(
            self.children_state(id),
            ChildrenState::NotLoaded | ChildrenState::Failed(_)
        );
        if needs_fetch {
            self.children.insert(id.clone(), ChildrenState::Loading);
        }
        needs_fetch
    }

    pub fn collapse(&mut self, id: &OrgUnitId) {
        self.expanded.remove(id);
    }

    pub fn children_loaded(&mut self, id: OrgUnitId, result: Result<Vec<OrganisationUnit>, String>) {
        let state = match result {
            Ok(mut children) => {
                sort_by_name(&mut children);
                ChildrenState::Loaded(children)
            }
            Err(message) => ChildrenState::Failed(message),
        };
        self.children.insert(id, state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::org_unit::OrgUnitPath;

    fn unit(id: &str, name: &str, path: &str) -> OrganisationUnit {
        OrganisationUnit {
            id: OrgUnitId::from(id),
            display_name: name.to_string(),
            path: OrgUnitPath::new(path),
            level: 2,
        }
    }

    #[test]
    fn expand_requests_fetch_once() {
        let id = OrgUnitId::from("root");
        let mut tree = OrgUnitTree::with_roots(vec![unit("root", "Root", "/root")]);

        assert!(tree.expand(&id), "first expand should fetch");
        assert!(!tree.expand(&id), "loading node should not refetch");

        tree.children_loaded(id.clone(), Ok(vec![unit("b", "Beta", "/root/b"), unit("a", "Alpha", "/root/a")]));
        tree.collapse(&id);

        assert!(!tree.is_expanded(&id));
        assert!(!tree.expand(&id), "loaded node should not refetch");
        match tree.children_state(&id) {
            ChildrenState::Loaded(children) => {
                let names: Vec<&str> = children.iter().map(|c| c.display_name.as_str()).collect();
                assert_eq!(names, vec!["Alpha", "Beta"], "children should be sorted");
            }
            other => panic!("expected loaded children, got {other:?}"),
        }
    }

    #[test]
    fn failed_load_is_retried_on_next_expand() {
        let id = OrgUnitId::from("root");
        let mut tree = OrgUnitTree::default();

        tree.expand(&id);
        tree.children_loaded(id.clone(), Err("timeout".to_string()));

        assert_eq!(
            tree.children_state(&id),
            &ChildrenState::Failed("timeout".to_string())
        );
        assert!(tree.expand(&id), "failed node should refetch");
    }

    #[test]
    fn empty_children_mark_leaf() {
        let id = OrgUnitId::from("facility");
        let mut tree = OrgUnitTree::default();

        assert!(!tree.is_leaf(&id), "unknown node is not yet a leaf");
        tree.children_loaded(id.clone(), Ok(Vec::new()));
        assert!(tree.is_leaf(&id));
    }
}
