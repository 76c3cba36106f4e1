pub mod dataset;
pub mod edit;
pub mod org_unit;
pub mod tree;
pub mod user;
