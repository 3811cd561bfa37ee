//! Image-upload intake: issue tokenized upload links with an expiry.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::Serialize;

use hv_domain::Result;

/// Inputs to [`ImageIntake::create_upload_request`].
#[derive(Debug, Clone, Default)]
pub struct UploadRequestSpec {
    pub customer_id: Option<i64>,
    pub email: String,
    pub appliance_type: Option<String>,
    pub issue_description: Option<String>,
    pub call_sid: Option<String>,
}

/// An issued upload grant.
#[derive(Debug, Clone, Serialize)]
pub struct UploadGrant {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub email: String,
    pub customer_id: Option<i64>,
    pub appliance_type: Option<String>,
    pub issue_description: Option<String>,
    pub call_sid: Option<String>,
    pub used: bool,
}

#[async_trait]
pub trait ImageIntake: Send + Sync {
    /// Issue a single-use upload token with the configured TTL.
    async fn create_upload_request(&self, spec: UploadRequestSpec) -> Result<UploadGrant>;

    /// Full URL the customer opens to upload.
    fn upload_url(&self, token: &str) -> String;

    /// Link validity window, for the spoken confirmation.
    fn link_ttl_hours(&self) -> u32;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// In-memory implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct InMemoryImageIntake {
    base_url: String,
    ttl_hours: u32,
    grants: RwLock<HashMap<String, UploadGrant>>,
}

impl InMemoryImageIntake {
    pub fn new(base_url: impl Into<String>, ttl_hours: u32) -> Self {
        Self {
            base_url: base_url.into(),
            ttl_hours,
            grants: RwLock::new(HashMap::new()),
        }
    }

    pub fn get_grant(&self, token: &str) -> Option<UploadGrant> {
        self.grants.read().get(token).cloned()
    }
}

#[async_trait]
impl ImageIntake for InMemoryImageIntake {
    async fn create_upload_request(&self, spec: UploadRequestSpec) -> Result<UploadGrant> {
        let token = uuid::Uuid::new_v4().simple().to_string();
        let grant = UploadGrant {
            token: token.clone(),
            expires_at: Utc::now() + Duration::hours(i64::from(self.ttl_hours)),
            email: spec.email,
            customer_id: spec.customer_id,
            appliance_type: spec.appliance_type,
            issue_description: spec.issue_description,
            call_sid: spec.call_sid,
            used: false,
        };
        self.grants.write().insert(token, grant.clone());
        tracing::info!(token = %grant.token, email = %grant.email, "upload request issued");
        Ok(grant)
    }

    fn upload_url(&self, token: &str) -> String {
        format!("{}/upload/{token}", self.base_url.trim_end_matches('/'))
    }

    fn link_ttl_hours(&self) -> u32 {
        self.ttl_hours
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn grants_carry_expiry_and_are_unique() {
        let intake = InMemoryImageIntake::new("https://voice.example.com", 24);
        let a = intake
            .create_upload_request(UploadRequestSpec {
                email: "jane@example.com".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        let b = intake
            .create_upload_request(UploadRequestSpec {
                email: "jane@example.com".into(),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_ne!(a.token, b.token);
        assert!(a.expires_at > Utc::now() + Duration::hours(23));
        assert!(a.expires_at <= Utc::now() + Duration::hours(24));
        assert!(intake.get_grant(&a.token).is_some());
    }

    #[tokio::test]
    async fn upload_url_composition() {
        let intake = InMemoryImageIntake::new("https://voice.example.com/", 24);
        assert_eq!(
            intake.upload_url("abc123"),
            "https://voice.example.com/upload/abc123"
        );
    }
}
