pub mod config;
pub mod dhis2;
