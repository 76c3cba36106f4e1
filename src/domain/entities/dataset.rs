use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DatasetId(pub String);

impl From<&str> for DatasetId {
    fn from(value: &str) -> Self {
        DatasetId(value.to_string())
    }
}

impl From<String> for DatasetId {
    fn from(value: String) -> Self {
        DatasetId(value)
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    pub id: DatasetId,
    pub display_name: String,
    pub code: Option<String>,
}

impl Dataset {
    /// Case-insensitive substring match on display name or code. A blank
    /// filter matches everything.
    pub fn matches_filter(&self, filter: &str) -> bool {
        let needle = filter.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.display_name.to_lowercase().contains(&needle)
            || self
                .code
                .as_deref()
                .is_some_and(|code| code.to_lowercase().contains(&needle))
    }
}

pub fn sort_for_selector(datasets: &mut [Dataset]) {
    datasets.sort_by(|a, b| {
        a.display_name
            .to_lowercase()
            .cmp(&b.display_name.to_lowercase())
            .then_with(|| a.id.cmp(&b.id))
    });
}

pub fn filter_datasets<'a>(datasets: &'a [Dataset], filter: &str) -> Vec<&'a Dataset> {
    datasets
        .iter()
        .filter(|dataset| dataset.matches_filter(filter))
        .collect()
}
