use std::sync::Arc;

use futures::future::try_join;
use tracing::info;

use crate::domain::entities::dataset::{sort_for_selector, Dataset, DatasetId};
use crate::domain::entities::edit::LinkageBaseline;
use crate::domain::entities::org_unit::{sort_by_name, OrgUnitId, OrganisationUnit};
use crate::domain::entities::user::User;
use crate::usecase::ports::repo::{LinkageRepository, RepoError};

/// Data fetched once per screen load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceData {
    pub user: User,
    pub datasets: Vec<Dataset>,
}

impl ReferenceData {
    pub fn dataset(&self, id: &DatasetId) -> Option<&Dataset> {
        self.datasets.iter().find(|dataset| &dataset.id == id)
    }
}

pub struct QueryService {
    repo: Arc<dyn LinkageRepository>,
}

impl QueryService {
    pub fn new(repo: Arc<dyn LinkageRepository>) -> Self {
        Self { repo }
    }

    pub async fn load_reference_data(&self) -> Result<ReferenceData, RepoError> {
        let (user, mut datasets) =
            try_join(self.repo.current_user(), self.repo.list_datasets()).await?;
        sort_for_selector(&mut datasets);
        info!(
            user = %user.id,
            name = %user.name,
            roots = user.organisation_units.len(),
            datasets = datasets.len(),
            "loaded reference data"
        );
        Ok(ReferenceData { user, datasets })
    }

    pub async fn load_baseline(&self, dataset: &DatasetId) -> Result<LinkageBaseline, RepoError> {
        let units = self.repo.linked_org_units(dataset).await?;
        info!(dataset = %dataset, linked = units.len(), "loaded dataset linkage");
        Ok(LinkageBaseline::from_units(units))
    }

    pub async fn load_children(&self, id: &OrgUnitId) -> Result<Vec<OrganisationUnit>, RepoError> {
        let mut children = self.repo.org_unit_children(id).await?;
        sort_by_name(&mut children);
        Ok(children)
    }
}
