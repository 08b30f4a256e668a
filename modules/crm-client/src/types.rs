use serde::{Deserialize, Serialize};

/// Credentials for the OAuth2 username-password flow.
#[derive(Debug, Clone)]
pub struct LoginOptions {
    /// e.g. `https://login.salesforce.com` or `https://test.salesforce.com` for sandboxes.
    pub login_url: String,
    /// REST API version without the leading `v`, e.g. `59.0`.
    pub api_version: String,
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    /// Password with the security token appended, if the org requires one.
    pub password: String,
}

/// Response of `POST /services/oauth2/token`.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub instance_url: String,
    /// Identity URL; its last two path segments are the org and user ids.
    pub id: String,
    pub token_type: Option<String>,
    pub issued_at: Option<String>,
}

impl TokenResponse {
    /// `(organization_id, user_id)` parsed from the identity URL.
    pub fn identity(&self) -> Option<(&str, &str)> {
        let mut segments = self.id.trim_end_matches('/').rsplit('/');
        let user_id = segments.next()?;
        let org_id = segments.next()?;
        Some((org_id, user_id))
    }
}

/// Error body returned by the token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthError {
    pub error: String,
    pub error_description: Option<String>,
}

/// One page of a SOQL query result.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryPage<T> {
    pub total_size: u64,
    pub done: bool,
    pub records: Vec<T>,
    pub next_records_url: Option<String>,
}

/// Per-record result of a collection update.
#[derive(Debug, Clone, Deserialize)]
pub struct SaveResult {
    pub id: Option<String>,
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<SaveError>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveError {
    pub status_code: String,
    pub message: String,
    #[serde(default)]
    pub fields: Vec<String>,
}

/// Body of `PATCH /composite/sobjects`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CollectionRequest<'a> {
    pub all_or_none: bool,
    pub records: &'a [serde_json::Value],
}
