use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, Response};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::dao::{
    record_store::{RecordScope, RecordStore},
    storage::StorageResult,
};

use super::{
    config::RestConfig,
    error::{RestDaoError, RestResult},
};

const REST_PREFIX: &str = "rest/v1";
const UPSERT_PREFERENCE: &str = "resolution=merge-duplicates,return=minimal";

/// Error body returned by PostgREST on failed requests.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    details: Option<String>,
}

/// Record store talking to a PostgREST endpoint over HTTP.
#[derive(Clone)]
pub struct RestRecordStore {
    client: Client,
    base_url: Arc<str>,
    api_key: Arc<str>,
    bearer: Arc<str>,
}

impl RestRecordStore {
    /// Build the HTTP client for the configured backend.
    ///
    /// No request is issued here; connectivity problems surface on the first call.
    pub fn connect(config: RestConfig) -> RestResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| RestDaoError::ClientBuilder { source })?;

        let bearer = config
            .access_token
            .unwrap_or_else(|| config.api_key.clone());

        Ok(Self {
            client,
            base_url: Arc::<str>::from(config.base_url.trim_end_matches('/')),
            api_key: Arc::<str>::from(config.api_key),
            bearer: Arc::<str>::from(bearer),
        })
    }

    fn request(&self, method: Method, collection: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}/{}", self.base_url, REST_PREFIX, collection);
        self.client
            .request(method, url)
            .header("apikey", self.api_key.as_ref())
            .bearer_auth(self.bearer.as_ref())
    }

    async fn select(&self, collection: &str, filters: Vec<(String, String)>) -> RestResult<Vec<Value>> {
        let mut query = vec![("select".to_string(), "*".to_string())];
        query.extend(
            filters
                .into_iter()
                .map(|(field, value)| (field, format!("eq.{value}"))),
        );

        let response = self
            .request(Method::GET, collection)
            .query(&query)
            .send()
            .await
            .map_err(|source| RestDaoError::RequestSend {
                path: collection.to_string(),
                source,
            })?;

        let response = ensure_success(collection, response).await?;
        response
            .json::<Vec<Value>>()
            .await
            .map_err(|source| RestDaoError::DecodeResponse {
                path: collection.to_string(),
                source,
            })
    }

    async fn post(&self, collection: &str, record: &Value) -> RestResult<()> {
        let response = self
            .request(Method::POST, collection)
            .header("Prefer", UPSERT_PREFERENCE)
            .json(record)
            .send()
            .await
            .map_err(|source| RestDaoError::RequestSend {
                path: collection.to_string(),
                source,
            })?;

        ensure_success(collection, response).await.map(|_| ())
    }
}

/// Turn a non-success response into [`RestDaoError::RequestStatus`], keeping the
/// backend's message so it can be shown to the user.
async fn ensure_success(path: &str, response: Response) -> RestResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = match response.json::<ErrorBody>().await {
        Ok(ErrorBody {
            message: Some(message),
            ..
        }) => message,
        Ok(ErrorBody {
            details: Some(details),
            ..
        }) => details,
        _ => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
    };

    Err(RestDaoError::RequestStatus {
        path: path.to_string(),
        status,
        message,
    })
}

impl RecordStore for RestRecordStore {
    fn fetch(
        &self,
        collection: &str,
        id: &str,
        scope: &RecordScope,
    ) -> BoxFuture<'static, StorageResult<Option<Value>>> {
        let store = self.clone();
        let collection = collection.to_string();
        let mut filters = vec![("id".to_string(), id.to_string())];
        filters.extend(scope.filters().iter().cloned());
        Box::pin(async move {
            let rows = store.select(&collection, filters).await?;
            Ok(rows.into_iter().next())
        })
    }

    fn upsert(&self, collection: &str, record: Value) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let collection = collection.to_string();
        Box::pin(async move {
            store.post(&collection, &record).await?;
            debug!(%collection, "record upserted through REST backend");
            Ok(())
        })
    }

    fn query(
        &self,
        collection: &str,
        scope: &RecordScope,
    ) -> BoxFuture<'static, StorageResult<Vec<Value>>> {
        let store = self.clone();
        let collection = collection.to_string();
        let filters = scope.filters().to_vec();
        Box::pin(async move { store.select(&collection, filters).await.map_err(Into::into) })
    }
}
