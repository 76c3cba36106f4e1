use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OrgUnitId(pub String);

impl From<&str> for OrgUnitId {
    fn from(value: &str) -> Self {
        OrgUnitId(value.to_string())
    }
}

impl From<String> for OrgUnitId {
    fn from(value: String) -> Self {
        OrgUnitId(value)
    }
}

impl fmt::Display for OrgUnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hierarchy path of an organisation unit, e.g. `/ImspTQPwCqd/O6uvpzGd5pu`.
///
/// Each segment is the id of an ancestor and the last segment is the unit
/// itself. Tree relationships are derived from path prefixes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OrgUnitPath(String);

impl OrgUnitPath {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let trimmed = raw.trim().trim_end_matches('/');
        if trimmed.starts_with('/') {
            OrgUnitPath(trimmed.to_string())
        } else {
            OrgUnitPath(format!("/{trimmed}"))
        }
    }

    /// Path for a unit whose ancestry is unknown.
    pub fn root_of(id: &OrgUnitId) -> Self {
        OrgUnitPath(format!("/{}", id.0))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|segment| !segment.is_empty())
    }

    /// True when `other` lies strictly below this path.
    pub fn is_ancestor_of(&self, other: &OrgUnitPath) -> bool {
        other
            .0
            .strip_prefix(self.0.as_str())
            .is_some_and(|rest| rest.starts_with('/') && rest.len() > 1)
    }
}

impl fmt::Display for OrgUnitPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganisationUnit {
    pub id: OrgUnitId,
    pub display_name: String,
    pub path: OrgUnitPath,
    pub level: u32,
}

pub fn sort_by_name(units: &mut Vec<OrganisationUnit>) {
    units.sort_by(|a, b| {
        a.display_name
            .to_lowercase()
            .cmp(&b.display_name.to_lowercase())
            .then_with(|| a.id.cmp(&b.id))
    });
    units.dedup_by(|a, b| a.id == b.id);
}
