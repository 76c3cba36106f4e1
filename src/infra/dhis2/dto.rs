//! Wire shapes of the DHIS2 Web API resources this tool reads and writes.

use serde::{Deserialize, Serialize};

use crate::domain::entities::dataset::{Dataset, DatasetId};
use crate::domain::entities::edit::LinkageDelta;
use crate::domain::entities::org_unit::{OrgUnitId, OrgUnitPath, OrganisationUnit};
use crate::domain::entities::user::User;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeDto {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub organisation_units: Vec<OrgUnitDto>,
}

impl MeDto {
    pub fn into_domain(self) -> User {
        User {
            id: self.id,
            name: self.name,
            email: self.email.filter(|email| !email.is_empty()),
            organisation_units: self
                .organisation_units
                .into_iter()
                .map(OrgUnitDto::into_domain)
                .collect(),
        }
    }
}

/// `me` returns `name`; dataset and child listings return `displayName`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgUnitDto {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub level: Option<u32>,
}

impl OrgUnitDto {
    pub fn into_domain(self) -> OrganisationUnit {
        let id = OrgUnitId(self.id);
        let path = match self.path {
            Some(path) if !path.trim().is_empty() => OrgUnitPath::new(path),
            _ => OrgUnitPath::root_of(&id),
        };
        let level = self
            .level
            .unwrap_or_else(|| path.segments().count() as u32);
        let display_name = self
            .display_name
            .or(self.name)
            .unwrap_or_else(|| id.0.clone());
        OrganisationUnit {
            id,
            display_name,
            path,
            level,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSetListDto {
    #[serde(default)]
    pub data_sets: Vec<DataSetDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSetDto {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

impl DataSetDto {
    pub fn into_domain(self) -> Dataset {
        let display_name = self.display_name.unwrap_or_else(|| self.id.clone());
        Dataset {
            id: DatasetId(self.id),
            display_name,
            code: self.code.filter(|code| !code.is_empty()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSetLinksDto {
    pub id: String,
    #[serde(default)]
    pub organisation_units: Vec<OrgUnitDto>,
}

#[derive(Debug, Deserialize)]
pub struct OrgUnitChildrenDto {
    #[serde(default)]
    pub children: Vec<OrgUnitDto>,
}

#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct IdRefDto {
    pub id: String,
}

#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct LinkageDeltaDto {
    pub additions: Vec<IdRefDto>,
    pub deletions: Vec<IdRefDto>,
}

impl From<&LinkageDelta> for LinkageDeltaDto {
    fn from(delta: &LinkageDelta) -> Self {
        Self {
            additions: id_refs(&delta.additions),
            deletions: id_refs(&delta.deletions),
        }
    }
}

fn id_refs(ids: &[OrgUnitId]) -> Vec<IdRefDto> {
    ids.iter().map(|id| IdRefDto { id: id.0.clone() }).collect()
}

/// Error envelope DHIS2 returns on failed requests.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebMessageDto {
    #[serde(default)]
    pub message: Option<String>,
}
