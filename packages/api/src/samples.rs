//! Sample prospects: generated by the backend, or a fixed offline set.

use reqwest::Method;
use serde::Deserialize;
use store::{DocumentStore, NewProspect, ProspectStatus, ProspectStore};
use tracing::info;

use crate::client::{ApiClient, ROUTES};
use crate::error::ApiError;

/// A prospect as the backend returns it. Ids, owners and timestamps are
/// reassigned when it is written to the store.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteProspect {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub company: String,
    pub position: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub linkedin: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub status: ProspectStatus,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl RemoteProspect {
    pub fn into_new(self, owner_id: &str) -> NewProspect {
        NewProspect {
            owner_id: owner_id.to_string(),
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            company: self.company,
            position: self.position,
            location: self.location,
            linkedin: self.linkedin,
            notes: self.notes,
            status: self.status,
            tags: self.tags,
            ..NewProspect::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SampleData {
    pub success: bool,
    pub count: usize,
    pub prospects: Vec<RemoteProspect>,
}

impl ApiClient {
    pub async fn generate_sample_data(&self) -> Result<SampleData, ApiError> {
        let path = format!("{ROUTES}/prospects/generate-sample-data");
        self.send_json(self.request(Method::POST, &path)).await
    }
}

/// Fetch generated prospects and add each one for `owner_id`. Returns how many were added.
pub async fn import_sample_data<S: DocumentStore>(
    client: &ApiClient,
    store: &ProspectStore<S>,
    owner_id: &str,
) -> Result<usize, ApiError> {
    let sample = client.generate_sample_data().await?;
    let prospects = sample
        .prospects
        .into_iter()
        .map(|p| p.into_new(owner_id))
        .collect();
    import_prospects(store, prospects).await
}

/// Add prospects through the store one by one, stopping at the first failure.
pub async fn import_prospects<S: DocumentStore>(
    store: &ProspectStore<S>,
    prospects: Vec<NewProspect>,
) -> Result<usize, ApiError> {
    let mut added = 0;
    for prospect in prospects {
        store.add(prospect).await?;
        added += 1;
    }
    info!(added, "imported sample prospects");
    Ok(added)
}

/// Three hand-written prospects for demos without a backend.
pub fn demo_prospects(owner_id: &str) -> Vec<NewProspect> {
    let demo = |first: &str, last: &str, email: &str, company: &str, position: &str| NewProspect {
        owner_id: owner_id.to_string(),
        first_name: first.into(),
        last_name: last.into(),
        email: email.into(),
        company: company.into(),
        position: position.into(),
        ..NewProspect::default()
    };

    vec![
        NewProspect {
            location: Some("San Francisco, CA".into()),
            tags: vec!["enterprise".into(), "decision-maker".into()],
            ..demo(
                "Sarah",
                "Johnson",
                "sarah.johnson@techvision.com",
                "TechVision Inc.",
                "VP of Engineering",
            )
        },
        NewProspect {
            location: Some("Seattle, WA".into()),
            status: ProspectStatus::Contacted,
            tags: vec!["technical".into(), "startup".into()],
            ..demo(
                "Michael",
                "Chen",
                "michael.chen@cloudscale.io",
                "CloudScale",
                "CTO",
            )
        },
        NewProspect {
            location: Some("New York, NY".into()),
            status: ProspectStatus::Qualified,
            tags: vec!["finance".into(), "high-priority".into()],
            ..demo(
                "Emily",
                "Rodriguez",
                "emily.rodriguez@finnovate.com",
                "Finnovate Partners",
                "Director of Operations",
            )
        },
    ]
}
