use async_trait::async_trait;
use tracing::debug;

use super::client::{Dhis2Client, Dhis2Error};
use super::dto::{
    DataSetDto, DataSetLinksDto, DataSetListDto, LinkageDeltaDto, MeDto, OrgUnitChildrenDto,
    OrgUnitDto,
};
use crate::domain::entities::dataset::{Dataset, DatasetId};
use crate::domain::entities::edit::LinkageDelta;
use crate::domain::entities::org_unit::{OrgUnitId, OrganisationUnit};
use crate::domain::entities::user::User;
use crate::usecase::ports::repo::{LinkageRepository, RepoError};

const ME_FIELDS: &str = "id,name,email,organisationUnits[id,name,level,path]";
const DATASET_LIST_FIELDS: &str = "id,displayName,code";
const DATASET_LINK_FIELDS: &str = "id,path,displayName,organisationUnits[id,path,displayName,level]";
const CHILDREN_FIELDS: &str = "id,children[id,displayName,path,level]";

impl From<Dhis2Error> for RepoError {
    fn from(err: Dhis2Error) -> Self {
        RepoError::Message(err.to_string())
    }
}

pub struct Dhis2Repo {
    client: Dhis2Client,
}

impl Dhis2Repo {
    pub fn new(client: Dhis2Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LinkageRepository for Dhis2Repo {
    async fn current_user(&self) -> Result<User, RepoError> {
        let me: MeDto = self.client.get_json("me", &[("fields", ME_FIELDS)]).await?;
        Ok(me.into_domain())
    }

    async fn list_datasets(&self) -> Result<Vec<Dataset>, RepoError> {
        let list: DataSetListDto = self
            .client
            .get_json(
                "dataSets",
                &[("fields", DATASET_LIST_FIELDS), ("paging", "false")],
            )
            .await?;
        Ok(list.data_sets.into_iter().map(DataSetDto::into_domain).collect())
    }

    async fn linked_org_units(
        &self,
        dataset: &DatasetId,
    ) -> Result<Vec<OrganisationUnit>, RepoError> {
        let links: DataSetLinksDto = self
            .client
            .get_json(
                &format!("dataSets/{}", dataset.0),
                &[("fields", DATASET_LINK_FIELDS), ("paging", "false")],
            )
            .await?;
        debug!(dataset = %links.id, units = links.organisation_units.len(), "decoded linkage");
        Ok(links
            .organisation_units
            .into_iter()
            .map(OrgUnitDto::into_domain)
            .collect())
    }

    async fn org_unit_children(&self, id: &OrgUnitId) -> Result<Vec<OrganisationUnit>, RepoError> {
        let parent: OrgUnitChildrenDto = self
            .client
            .get_json(
                &format!("organisationUnits/{}", id.0),
                &[("fields", CHILDREN_FIELDS)],
            )
            .await?;
        Ok(parent
            .children
            .into_iter()
            .map(OrgUnitDto::into_domain)
            .collect())
    }

    async fn submit_linkage(
        &self,
        dataset: &DatasetId,
        delta: &LinkageDelta,
    ) -> Result<(), RepoError> {
        let body = LinkageDeltaDto::from(delta);
        self.client
            .post_json(&format!("dataSets/{}/organisationUnits", dataset.0), &body)
            .await?;
        Ok(())
    }
}
