use std::sync::Arc;

use tracing::{error, info};

use crate::domain::entities::dataset::DatasetId;
use crate::domain::entities::edit::LinkageDelta;
use crate::usecase::ports::repo::{LinkageRepository, RepoError};

pub struct EditService {
    repo: Arc<dyn LinkageRepository>,
}

impl EditService {
    pub fn new(repo: Arc<dyn LinkageRepository>) -> Self {
        Self { repo }
    }

    /// Submits `delta` for `dataset`. An empty delta is rejected without a
    /// request.
    pub async fn save_linkage(
        &self,
        dataset: &DatasetId,
        delta: &LinkageDelta,
    ) -> Result<(), RepoError> {
        if delta.is_empty() {
            return Err(RepoError::Message("no changes to save".to_string()));
        }

        match self.repo.submit_linkage(dataset, delta).await {
            Ok(()) => {
                info!(
                    dataset = %dataset,
                    additions = delta.additions.len(),
                    deletions = delta.deletions.len(),
                    "saved dataset linkage"
                );
                Ok(())
            }
            Err(err) => {
                error!(dataset = %dataset, error = %err, "saving dataset linkage failed");
                Err(err)
            }
        }
    }
}
