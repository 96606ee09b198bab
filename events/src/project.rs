//! Project and application events.

use crate::payload;
use serde::{Deserialize, Serialize};

/// Aggregate type of projects (applications live inside their project).
pub const AGGREGATE_TYPE: &str = "project";

/// Project was created.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Added {
    /// Project name.
    pub name: String,
}
payload!(Added, AGGREGATE_TYPE, "project.added");

/// Application was added to a project.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApplicationAdded {
    /// Application id.
    pub app_id: String,
    /// Application name.
    pub name: String,
}
payload!(ApplicationAdded, AGGREGATE_TYPE, "project.application.added");

/// OIDC configuration (and client id) was added to an application.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct OidcConfigAdded {
    /// Application id.
    pub app_id: String,
    /// Generated client id.
    pub client_id: String,
}
payload!(OidcConfigAdded, AGGREGATE_TYPE, "project.application.config.oidc.added");

/// API configuration (and client id) was added to an application.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiConfigAdded {
    /// Application id.
    pub app_id: String,
    /// Generated client id.
    pub client_id: String,
}
payload!(ApiConfigAdded, AGGREGATE_TYPE, "project.application.config.api.added");
