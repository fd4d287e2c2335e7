// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTPS client for a remote metadata store.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use tracing::{debug, warn};

use super::{GetMetadataRequest, MessageResponse, MetadataStore, SetMetadataRequest, StoreError};
use crate::config::MetadataConfig;
use crate::crypto::{PubKeyParams, SignedRecord};

const API_KEY_HEADER: &str = "x-api-key";
const EMBED_HOST_HEADER: &str = "x-embed-host";

#[derive(Debug, Clone)]
pub struct HttpMetadataStore {
    config: MetadataConfig,
    http: Client,
}

impl HttpMetadataStore {
    pub fn new(config: MetadataConfig) -> Result<Self, StoreError> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| StoreError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { config, http })
    }

    pub fn from_env() -> Result<Self, StoreError> {
        Self::new(MetadataConfig::from_env()?)
    }

    pub fn config(&self) -> &MetadataConfig {
        &self.config
    }

    fn with_headers(&self, request: RequestBuilder) -> RequestBuilder {
        let request = match &self.config.api_key {
            Some(key) => request.header(API_KEY_HEADER, key),
            None => request,
        };
        match &self.config.embed_host {
            Some(host) => request.header(EMBED_HOST_HEADER, host),
            None => request,
        }
    }

    async fn post_json<B>(
        &self,
        path: &str,
        body: &B,
        to_error: fn(String) -> StoreError,
    ) -> Result<String, StoreError>
    where
        B: Serialize + Sync,
    {
        let url = self.config.endpoint(path);
        let response = self
            .with_headers(self.http.post(&url))
            .json(body)
            .send()
            .await
            .map_err(|e| to_error(format!("POST {path} failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(%status, path, "metadata store returned an error");
            return Err(to_error(format!("POST {path} returned {status}: {body}")));
        }

        let parsed: MessageResponse = response
            .json()
            .await
            .map_err(|e| to_error(format!("POST {path} invalid JSON: {e}")))?;
        Ok(parsed.message)
    }
}

#[async_trait]
impl MetadataStore for HttpMetadataStore {
    async fn set_metadata(
        &self,
        record: &SignedRecord,
        namespace: Option<&str>,
    ) -> Result<String, StoreError> {
        debug!(
            pub_key_x = %record.pub_key_x,
            namespace = namespace.unwrap_or_default(),
            "metadata set"
        );
        let body = SetMetadataRequest::new(record, namespace);
        self.post_json("set", &body, StoreError::Write).await
    }

    async fn get_metadata(
        &self,
        pub_key: &PubKeyParams,
        namespace: Option<&str>,
    ) -> Result<String, StoreError> {
        debug!(
            pub_key_x = %pub_key.pub_key_x,
            namespace = namespace.unwrap_or_default(),
            "metadata get"
        );
        let body = GetMetadataRequest::new(pub_key, namespace);
        self.post_json("get", &body, StoreError::Read).await
    }

    fn server_time_offset_ms(&self) -> i64 {
        self.config.server_time_offset_ms
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::Value;

    use super::*;
    use crate::crypto::{build_signed_record_at, PrivateKey};
    use crate::resolver::ShareResolver;
    use crate::store::InMemoryMetadataStore;

    #[derive(Clone, Default)]
    struct MockServer {
        store: InMemoryMetadataStore,
        seen_headers: Arc<Mutex<Vec<HeaderMap>>>,
        seen_bodies: Arc<Mutex<Vec<Value>>>,
        reject_all: bool,
    }

    impl MockServer {
        fn record(&self, headers: HeaderMap, body: &Value) {
            self.seen_headers.lock().unwrap().push(headers);
            self.seen_bodies.lock().unwrap().push(body.clone());
        }
    }

    async fn handle_set(
        State(mock): State<MockServer>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> Result<Json<MessageResponse>, (StatusCode, String)> {
        mock.record(headers, &body);
        if mock.reject_all {
            return Err((StatusCode::INTERNAL_SERVER_ERROR, "down".to_string()));
        }
        let request: SetMetadataRequest = serde_json::from_value(body)
            .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
        let (record, namespace) = request.into_record();
        let message = mock
            .store
            .set_metadata(&record, namespace.as_deref())
            .await
            .map_err(|e| (StatusCode::FORBIDDEN, e.to_string()))?;
        Ok(Json(MessageResponse { message }))
    }

    async fn handle_get(
        State(mock): State<MockServer>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> Result<Json<MessageResponse>, (StatusCode, String)> {
        mock.record(headers, &body);
        if mock.reject_all {
            return Err((StatusCode::INTERNAL_SERVER_ERROR, "down".to_string()));
        }
        let request: GetMetadataRequest = serde_json::from_value(body)
            .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
        let message = mock
            .store
            .get_metadata(&request.pub_key(), request.namespace.as_deref())
            .await
            .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
        Ok(Json(MessageResponse { message }))
    }

    async fn spawn_server(mock: MockServer) -> String {
        let app = Router::new()
            .route("/set", post(handle_set))
            .route("/get", post(handle_get))
            .with_state(mock);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn client_for(host: &str) -> HttpMetadataStore {
        let config = MetadataConfig::new(host)
            .unwrap()
            .with_request_timeout(Duration::from_secs(5));
        HttpMetadataStore::new(config).unwrap()
    }

    #[tokio::test]
    async fn set_then_get_over_http() {
        let mock = MockServer::default();
        let client = client_for(&spawn_server(mock.clone()).await);
        let key = PrivateKey::generate();

        let record = build_signed_record_at("hello", &key, 1).unwrap();
        let message = client.set_metadata(&record, Some("ns")).await.unwrap();
        assert_eq!(message, "success");

        let params = key.pub_key_params();
        assert_eq!(client.get_metadata(&params, Some("ns")).await.unwrap(), "hello");
        assert_eq!(client.get_metadata(&params, None).await.unwrap(), "");
    }

    #[tokio::test]
    async fn headers_and_namespace_follow_config() {
        let mock = MockServer::default();
        let host = spawn_server(mock.clone()).await;
        let config = MetadataConfig::new(&host)
            .unwrap()
            .with_api_key("secret-key")
            .with_embed_host("wallet.example");
        let client = HttpMetadataStore::new(config).unwrap();

        let params = PrivateKey::generate().pub_key_params();
        client.get_metadata(&params, None).await.unwrap();

        let headers = mock.seen_headers.lock().unwrap().clone();
        assert_eq!(headers[0][API_KEY_HEADER], "secret-key");
        assert_eq!(headers[0][EMBED_HOST_HEADER], "wallet.example");

        let bodies = mock.seen_bodies.lock().unwrap().clone();
        assert!(bodies[0].get("namespace").is_none());
        assert_eq!(bodies[0]["pub_key_X"], Value::String(params.pub_key_x));
    }

    #[tokio::test]
    async fn headers_are_absent_by_default() {
        let mock = MockServer::default();
        let client = client_for(&spawn_server(mock.clone()).await);

        client
            .get_metadata(&PrivateKey::generate().pub_key_params(), Some("ns"))
            .await
            .unwrap();

        let headers = mock.seen_headers.lock().unwrap().clone();
        assert!(headers[0].get(API_KEY_HEADER).is_none());
        assert!(headers[0].get(EMBED_HOST_HEADER).is_none());
    }

    #[tokio::test]
    async fn server_errors_map_to_read_and_write() {
        let mock = MockServer {
            reject_all: true,
            ..MockServer::default()
        };
        let client = client_for(&spawn_server(mock).await);
        let key = PrivateKey::generate();

        let record = build_signed_record_at("x", &key, 1).unwrap();
        assert!(matches!(
            client.set_metadata(&record, None).await,
            Err(StoreError::Write(_))
        ));
        assert!(matches!(
            client.get_metadata(&key.pub_key_params(), None).await,
            Err(StoreError::Read(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_store_is_a_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = client_for(&format!("http://{addr}"));
        assert!(matches!(
            client
                .get_metadata(&PrivateKey::generate().pub_key_params(), None)
                .await,
            Err(StoreError::Read(_))
        ));
    }

    #[tokio::test]
    async fn resolver_round_trip_over_http() {
        let mock = MockServer::default();
        let client = client_for(&spawn_server(mock.clone()).await);
        let resolver = ShareResolver::new(client);

        let owner = PrivateKey::generate();
        resolver
            .set_device_share(&owner, "laptop", &"device secret".to_string())
            .await
            .unwrap();
        let read: Option<String> = resolver.get_device_share(&owner, "laptop").await.unwrap();
        assert_eq!(read.as_deref(), Some("device secret"));

        let submitter = PrivateKey::generate();
        let recipient = PrivateKey::generate();
        resolver
            .set_torus_share(&recipient.pub_key_params(), &submitter, "github", &"gh".to_string())
            .await
            .unwrap();
        let read: Option<String> = resolver
            .get_torus_share(&recipient, &submitter, "github")
            .await
            .unwrap();
        assert_eq!(read.as_deref(), Some("gh"));
    }

    #[tokio::test]
    async fn offset_comes_from_config() {
        let config = MetadataConfig::default().with_server_time_offset_ms(-5000);
        let client = HttpMetadataStore::new(config).unwrap();
        assert_eq!(client.server_time_offset_ms(), -5000);
    }
}
