use async_trait::async_trait;

use crate::domain::entities::dataset::{Dataset, DatasetId};
use crate::domain::entities::edit::LinkageDelta;
use crate::domain::entities::org_unit::{OrgUnitId, OrganisationUnit};
use crate::domain::entities::user::User;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepoError {
    #[error("{0}")]
    Message(String),
}

#[async_trait]
pub trait LinkageRepository: Send + Sync {
    async fn current_user(&self) -> Result<User, RepoError>;
    async fn list_datasets(&self) -> Result<Vec<Dataset>, RepoError>;

    /// Organisation units currently linked to `dataset`.
    async fn linked_org_units(&self, dataset: &DatasetId)
        -> Result<Vec<OrganisationUnit>, RepoError>;
    async fn org_unit_children(&self, id: &OrgUnitId) -> Result<Vec<OrganisationUnit>, RepoError>;

    /// Applies additions and deletions to `dataset` in one request.
    async fn submit_linkage(&self, dataset: &DatasetId, delta: &LinkageDelta)
        -> Result<(), RepoError>;
}
