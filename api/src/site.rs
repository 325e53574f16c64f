use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Request to provision or deprovision the resources backing one site.
///
/// The same two fields are sent for both operations, the deprovision path only
/// looks at the domain name.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SiteRequest {
    /// Fully qualified domain name the site is served on, e.g. `foo.example.com`.
    /// The first label names and tags every resource belonging to the site.
    pub domain_name: String,

    /// Externally assigned identifier of the site.
    /// Only ever used as a label value.
    #[serde(rename = "websiteId")]
    pub site_id: String,
}

impl SiteRequest {
    pub fn new(domain_name: impl Into<String>, site_id: impl Into<String>) -> Self {
        SiteRequest {
            domain_name: domain_name.into(),
            site_id: site_id.into(),
        }
    }
}
