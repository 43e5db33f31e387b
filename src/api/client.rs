use anyhow::{Context, Result};
use reqwest::{Response, StatusCode};
use std::time::Duration;
use tracing::{debug, info};

use super::{PeerSource, TorrentApi};
use crate::core::error::ClientError;
use crate::models::peer::PeerList;
use crate::models::torrent::Torrent;

/// Body qBittorrent answers a successful login with
const LOGIN_OK: &str = "Ok.";

/// Client for the qBittorrent Web API (`/api/v2`)
pub struct ApiClient {
    client: reqwest::Client,
    endpoint: String,
    credentials: Option<(String, String)>,
}

impl ApiClient {
    pub fn new(endpoint: String, timeout: Duration) -> Result<Self> {
        // The cookie store keeps the SID handed out by a login
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .cookie_store(true)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            credentials: None,
        })
    }

    pub fn with_credentials(mut self, username: String, password: String) -> Self {
        self.credentials = Some((username, password));
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v2/{}", self.endpoint, path)
    }

    /// Every endpoint used here answers 200 on success
    fn check_status(url: &str, response: Response) -> Result<Response, ClientError> {
        let status = response.status();
        if status != StatusCode::OK {
            return Err(ClientError::Status {
                endpoint: url.to_string(),
                status,
            });
        }
        Ok(response)
    }

    fn transport(url: &str) -> impl FnOnce(reqwest::Error) -> ClientError + '_ {
        move |source| ClientError::Transport {
            endpoint: url.to_string(),
            source,
        }
    }

    fn decode(url: &str) -> impl FnOnce(reqwest::Error) -> ClientError + '_ {
        move |source| ClientError::Decode {
            endpoint: url.to_string(),
            source,
        }
    }
}

impl PeerSource for ApiClient {
    async fn peer_count(&self, hash: &str) -> Result<usize, ClientError> {
        let url = self.url("sync/torrentPeers");
        let response = self
            .client
            .get(&url)
            .query(&[("hash", hash)])
            .send()
            .await
            .map_err(Self::transport(&url))?;

        let peers = Self::check_status(&url, response)?
            .json::<PeerList>()
            .await
            .map_err(Self::decode(&url))?;

        debug!(hash = %hash, peers = peers.count(), "Fetched torrent peers");
        Ok(peers.count())
    }
}

impl TorrentApi for ApiClient {
    async fn authenticate(&self) -> Result<(), ClientError> {
        let Some((username, password)) = &self.credentials else {
            return Ok(());
        };

        let url = self.url("auth/login");
        let response = self
            .client
            .post(&url)
            .form(&[("username", username.as_str()), ("password", password.as_str())])
            .send()
            .await
            .map_err(Self::transport(&url))?;

        // Bad credentials still answer 200, with "Fails." as the body
        let body = Self::check_status(&url, response)?
            .text()
            .await
            .map_err(Self::decode(&url))?;

        if body.trim() != LOGIN_OK {
            return Err(ClientError::LoginRejected);
        }

        debug!(username = %username, "Logged in to torrent client");
        Ok(())
    }

    async fn set_listening_port(&self, port: u16) -> Result<(), ClientError> {
        let url = self.url("app/setPreferences");
        let preferences = serde_json::json!({ "listen_port": port }).to_string();

        let response = self
            .client
            .post(&url)
            .form(&[("json", preferences)])
            .send()
            .await
            .map_err(Self::transport(&url))?;

        let status = response.status();
        Self::check_status(&url, response)?;

        info!(status = %status, port = port, "Listening port updated");
        Ok(())
    }

    async fn list_torrents(&self, filter: &str) -> Result<Vec<Torrent>, ClientError> {
        let url = self.url("torrents/info");
        let response = self
            .client
            .get(&url)
            .query(&[("filter", filter)])
            .send()
            .await
            .map_err(Self::transport(&url))?;

        Self::check_status(&url, response)?
            .json::<Vec<Torrent>>()
            .await
            .map_err(Self::decode(&url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::DOWNLOADING_FILTER;
    use axum::{
        extract::{Form, Query, State},
        http::{header, HeaderMap, StatusCode},
        response::IntoResponse,
        routing::{get, post},
        Json, Router,
    };
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    type Captured = Arc<Mutex<Vec<HashMap<String, String>>>>;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client(endpoint: String) -> ApiClient {
        ApiClient::new(endpoint, Duration::from_secs(5)).unwrap()
    }

    async fn capture_form(
        State(captured): State<Captured>,
        Form(form): Form<HashMap<String, String>>,
    ) -> StatusCode {
        captured.lock().unwrap().push(form);
        StatusCode::OK
    }

    async fn torrents_info(Query(query): Query<HashMap<String, String>>) -> impl IntoResponse {
        assert_eq!(query.get("filter").map(String::as_str), Some("downloading"));
        Json(serde_json::json!([
            {
                "hash": "aaaa",
                "name": "first",
                "state": "stalledDL",
                "progress": 0.25,
                "last_activity": 1700000000,
                "num_leechs": 3
            },
            {
                "hash": "bbbb",
                "name": "second",
                "state": "downloading",
                "progress": 0.9,
                "last_activity": 1700000100
            }
        ]))
    }

    async fn torrent_peers(Query(query): Query<HashMap<String, String>>) -> impl IntoResponse {
        let peers = match query.get("hash").map(String::as_str) {
            Some("aaaa") => serde_json::json!({
                "1.1.1.1:6881": {"client": "a"},
                "2.2.2.2:6881": {"client": "b"},
                "3.3.3.3:6881": {"client": "c"}
            }),
            _ => serde_json::json!({}),
        };
        Json(serde_json::json!({ "rid": 1, "full_update": true, "peers": peers }))
    }

    #[test]
    fn test_api_client_creation() {
        let client = ApiClient::new(
            "http://localhost:8080/".to_string(),
            Duration::from_secs(10),
        );
        assert!(client.is_ok());
        assert_eq!(
            client.unwrap().url("torrents/info"),
            "http://localhost:8080/api/v2/torrents/info"
        );
    }

    #[tokio::test]
    async fn test_set_listening_port_sends_json_form() {
        let captured: Captured = Arc::default();
        let app = Router::new()
            .route("/api/v2/app/setPreferences", post(capture_form))
            .with_state(captured.clone());
        let endpoint = serve(app).await;

        client(endpoint).set_listening_port(41234).await.unwrap();

        let forms = captured.lock().unwrap();
        assert_eq!(forms.len(), 1);
        let payload: serde_json::Value = serde_json::from_str(&forms[0]["json"]).unwrap();
        assert_eq!(payload, serde_json::json!({ "listen_port": 41234 }));
    }

    #[tokio::test]
    async fn test_set_listening_port_checks_status() {
        let app = Router::new().route(
            "/api/v2/app/setPreferences",
            post(|| async { StatusCode::FORBIDDEN }),
        );
        let endpoint = serve(app).await;

        let err = client(endpoint).set_listening_port(41234).await.unwrap_err();
        match err {
            ClientError::Status { status, .. } => assert_eq!(status, StatusCode::FORBIDDEN),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_set_listening_port_rejects_no_content() {
        let app = Router::new().route(
            "/api/v2/app/setPreferences",
            post(|| async { StatusCode::NO_CONTENT }),
        );
        let endpoint = serve(app).await;

        let err = client(endpoint).set_listening_port(1).await.unwrap_err();
        match err {
            ClientError::Status { status, .. } => assert_eq!(status, StatusCode::NO_CONTENT),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_list_torrents_rejects_accepted_status() {
        let app = Router::new().route(
            "/api/v2/torrents/info",
            get(|| async { (StatusCode::ACCEPTED, Json(serde_json::json!([]))) }),
        );
        let endpoint = serve(app).await;

        let err = client(endpoint)
            .list_torrents(DOWNLOADING_FILTER)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Status { .. }));
    }

    #[tokio::test]
    async fn test_list_torrents() {
        let app = Router::new().route("/api/v2/torrents/info", get(torrents_info));
        let endpoint = serve(app).await;

        let torrents = client(endpoint)
            .list_torrents(DOWNLOADING_FILTER)
            .await
            .unwrap();

        assert_eq!(torrents.len(), 2);
        assert_eq!(torrents[0].hash, "aaaa");
        assert!(torrents[0].is_stalled());
        assert_eq!(torrents[1].state, "downloading");
        assert_eq!(torrents[1].last_activity, 1700000100);
    }

    #[tokio::test]
    async fn test_list_torrents_undecodable_body() {
        let app = Router::new().route("/api/v2/torrents/info", get(|| async { "Forbidden?" }));
        let endpoint = serve(app).await;

        let err = client(endpoint)
            .list_torrents(DOWNLOADING_FILTER)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_list_torrents_error_status() {
        let app = Router::new().route(
            "/api/v2/torrents/info",
            get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        );
        let endpoint = serve(app).await;

        let err = client(endpoint)
            .list_torrents(DOWNLOADING_FILTER)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Status { .. }));
    }

    #[tokio::test]
    async fn test_peer_count() {
        let app = Router::new().route("/api/v2/sync/torrentPeers", get(torrent_peers));
        let endpoint = serve(app).await;
        let client = client(endpoint);

        assert_eq!(client.peer_count("aaaa").await.unwrap(), 3);
        assert_eq!(client.peer_count("bbbb").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_peer_count_missing_torrent() {
        // qBittorrent answers 404 for an unknown hash
        let app = Router::new().route(
            "/api/v2/sync/torrentPeers",
            get(|| async { (StatusCode::NOT_FOUND, "Torrent hash was not found") }),
        );
        let endpoint = serve(app).await;

        let err = client(endpoint).peer_count("cccc").await.unwrap_err();
        assert!(matches!(err, ClientError::Status { .. }));
    }

    #[tokio::test]
    async fn test_unreachable_client_is_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client(format!("http://{}", addr))
            .set_listening_port(1)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Transport { .. }));
    }

    #[tokio::test]
    async fn test_authenticate_without_credentials_is_noop() {
        // Nothing listens here; no request may be made
        let client = client("http://127.0.0.1:9".to_string());
        assert!(client.authenticate().await.is_ok());
    }

    #[tokio::test]
    async fn test_login_session_cookie_is_reused() {
        async fn login(Form(form): Form<HashMap<String, String>>) -> impl IntoResponse {
            if form.get("username").map(String::as_str) == Some("admin")
                && form.get("password").map(String::as_str) == Some("secret")
            {
                ([(header::SET_COOKIE, "SID=abc123; path=/")], "Ok.").into_response()
            } else {
                "Fails.".into_response()
            }
        }

        async fn guarded(headers: HeaderMap) -> impl IntoResponse {
            let authorized = headers
                .get(header::COOKIE)
                .and_then(|value| value.to_str().ok())
                .is_some_and(|value| value.contains("SID=abc123"));
            if authorized {
                Json(serde_json::json!([])).into_response()
            } else {
                StatusCode::FORBIDDEN.into_response()
            }
        }

        let app = Router::new()
            .route("/api/v2/auth/login", post(login))
            .route("/api/v2/torrents/info", get(guarded));
        let endpoint = serve(app).await;

        let rejected = client(endpoint.clone())
            .with_credentials("admin".to_string(), "wrong".to_string());
        assert!(matches!(
            rejected.authenticate().await.unwrap_err(),
            ClientError::LoginRejected
        ));

        let client = client(endpoint).with_credentials("admin".to_string(), "secret".to_string());
        client.authenticate().await.unwrap();
        let torrents = client.list_torrents(DOWNLOADING_FILTER).await.unwrap();
        assert!(torrents.is_empty());
    }
}
