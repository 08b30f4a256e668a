pub mod error;
pub mod types;

pub use error::{CrmError, Result};
pub use types::{LoginOptions, QueryPage, SaveError, SaveResult, TokenResponse};

use std::future::Future;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use types::{CollectionRequest, OAuthError};

/// Maximum records the sObject Collections API accepts per request.
pub const MAX_COLLECTION_SIZE: usize = 200;

/// Authenticated Salesforce REST client. Construct with [`CrmClient::login`].
pub struct CrmClient {
    client: reqwest::Client,
    instance_url: String,
    api_version: String,
    access_token: String,
    token: TokenResponse,
}

impl CrmClient {
    /// Log in with the OAuth2 username-password flow.
    pub async fn login(options: &LoginOptions) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        let url = format!(
            "{}/services/oauth2/token",
            options.login_url.trim_end_matches('/')
        );
        let form = [
            ("grant_type", "password"),
            ("client_id", options.client_id.as_str()),
            ("client_secret", options.client_secret.as_str()),
            ("username", options.username.as_str()),
            ("password", options.password.as_str()),
        ];

        let resp = client.post(&url).form(&form).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<OAuthError>(&body) {
                Ok(err) => err.error_description.unwrap_or(err.error),
                Err(_) => body,
            };
            return Err(CrmError::Auth {
                status: status.as_u16(),
                message,
            });
        }

        let token: TokenResponse = resp.json().await?;
        tracing::info!(instance_url = %token.instance_url, "Logged in to CRM");

        Ok(Self {
            client,
            instance_url: token.instance_url.trim_end_matches('/').to_string(),
            api_version: options.api_version.trim_start_matches('v').to_string(),
            access_token: token.access_token.clone(),
            token,
        })
    }

    pub fn instance_url(&self) -> &str {
        &self.instance_url
    }

    /// The token response from login (identity URL, issue time).
    pub fn token(&self) -> &TokenResponse {
        &self.token
    }

    fn data_url(&self, path: &str) -> String {
        format!(
            "{}/services/data/v{}/{}",
            self.instance_url,
            self.api_version,
            path.trim_start_matches('/')
        )
    }

    /// Run a SOQL query and return only its first page.
    pub async fn query_page<T: DeserializeOwned>(&self, soql: &str) -> Result<QueryPage<T>> {
        let url = self.data_url("query");
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(&[("q", soql)])
            .send()
            .await?;

        Self::read_json(resp).await
    }

    /// Fetch the page behind a `nextRecordsUrl` cursor.
    pub async fn query_more<T: DeserializeOwned>(
        &self,
        next_records_url: &str,
    ) -> Result<QueryPage<T>> {
        let url = format!("{}{}", self.instance_url, next_records_url);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        Self::read_json(resp).await
    }

    /// Run a SOQL query, following `nextRecordsUrl` until the result is `done`.
    pub async fn query<T: DeserializeOwned>(&self, soql: &str) -> Result<Vec<T>> {
        tracing::info!(query = soql, "Running SOQL query");

        let first: QueryPage<T> = self.query_page(soql).await?;
        tracing::info!(total = first.total_size, done = first.done, "Query returned");

        collect_pages(first, |next| async move { self.query_more(&next).await }).await
    }

    /// Update records of one sObject type. Each record must serialize to a
    /// JSON object carrying its `Id`. Requests are split into chunks of
    /// [`MAX_COLLECTION_SIZE`]; per-record failures are reported in the
    /// returned results, not as an error.
    ///
    /// `Err` only when the first chunk fails. A later chunk failing after
    /// earlier ones were committed marks every record not yet sent as failed.
    pub async fn update_records<T: Serialize>(
        &self,
        sobject: &str,
        records: &[T],
    ) -> Result<Vec<SaveResult>> {
        let payload = collection_records(sobject, records)?;
        let url = self.data_url("composite/sobjects");
        let url = url.as_str();

        update_in_chunks(payload, MAX_COLLECTION_SIZE, |chunk| async move {
            let body = CollectionRequest {
                all_or_none: false,
                records: &chunk,
            };
            let resp = self
                .client
                .patch(url)
                .bearer_auth(&self.access_token)
                .json(&body)
                .send()
                .await?;

            let results: Vec<SaveResult> = Self::read_json(resp).await?;
            tracing::debug!(sobject, count = results.len(), "Collection update chunk done");
            Ok::<_, CrmError>(results)
        })
        .await
    }

    async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CrmError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = resp.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

/// Serialize records and tag each with the `attributes.type` the
/// collections API requires.
fn collection_records<T: Serialize>(sobject: &str, records: &[T]) -> Result<Vec<Value>> {
    records
        .iter()
        .map(|record| -> Result<Value> {
            let mut value = serde_json::to_value(record)?;
            let object = value
                .as_object_mut()
                .ok_or_else(|| CrmError::InvalidRecord(sobject.to_string()))?;
            object.insert("attributes".to_string(), json!({ "type": sobject }));
            Ok(value)
        })
        .collect()
}

/// Drain a paginated query starting from `first`. `next` fetches the page
/// behind a `nextRecordsUrl`. Any page error fails the whole query.
async fn collect_pages<T, F, Fut>(first: QueryPage<T>, mut next: F) -> Result<Vec<T>>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<QueryPage<T>>>,
{
    let mut page = first;
    let mut records = Vec::with_capacity(page.total_size as usize);
    loop {
        records.append(&mut page.records);
        if page.done {
            break;
        }
        let Some(url) = page.next_records_url.take() else {
            tracing::warn!("Query not done but no nextRecordsUrl given, stopping");
            break;
        };
        tracing::info!(next_records_url = %url, fetched = records.len(), "Fetching next page");
        page = next(url).await?;
    }

    Ok(records)
}

/// Send `payload` in chunks of `chunk_size` through `send`, concatenating
/// the per-record results in order.
async fn update_in_chunks<F, Fut>(
    payload: Vec<Value>,
    chunk_size: usize,
    mut send: F,
) -> Result<Vec<SaveResult>>
where
    F: FnMut(Vec<Value>) -> Fut,
    Fut: Future<Output = Result<Vec<SaveResult>>>,
{
    let mut results = Vec::with_capacity(payload.len());
    let chunks: Vec<&[Value]> = payload.chunks(chunk_size.max(1)).collect();

    for (i, chunk) in chunks.iter().enumerate() {
        match send(chunk.to_vec()).await {
            Ok(mut chunk_results) => results.append(&mut chunk_results),
            Err(e) if i == 0 => return Err(e),
            Err(e) => {
                tracing::warn!(
                    committed = results.len(),
                    error = %e,
                    "Collection update chunk failed after earlier chunks were committed"
                );
                let message = e.to_string();
                for unsent in &chunks[i..] {
                    results.extend(unsent.iter().map(|record| unsent_result(record, &message)));
                }
                break;
            }
        }
    }

    Ok(results)
}

fn unsent_result(record: &Value, message: &str) -> SaveResult {
    SaveResult {
        id: record.get("Id").and_then(Value::as_str).map(String::from),
        success: false,
        errors: vec![SaveError {
            status_code: "CHUNK_NOT_COMMITTED".to_string(),
            message: message.to_string(),
            fields: vec![],
        }],
    }
}
