use crate::domain::entities::org_unit::{sort_by_name, OrganisationUnit};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub organisation_units: Vec<OrganisationUnit>,
}

impl User {
    /// Units the user administers, in the order the tree shows them.
    pub fn tree_roots(&self) -> Vec<OrganisationUnit> {
        let mut roots = self.organisation_units.clone();
        sort_by_name(&mut roots);
        roots
    }
}
