//! qBittorrent Web API adapter.
//!
//! Construction performs no network I/O. The first request logs in and the
//! session cookie is reused until the client answers `403`, after which the
//! next request logs in again.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use crate::client::TorrentClient;
use crate::error::{TorrentError, TorrentResult};
use crate::model::{AddTorrent, TorrentClientDescriptor, TorrentState, TorrentSummary};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const LOGIN_OK: &str = "Ok.";

/// Connection settings for a qBittorrent Web UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QbittorrentOptions {
    /// Web UI host.
    pub host: String,
    /// Web UI port.
    pub port: u16,
    /// Web UI username; empty disables login.
    pub username: String,
    /// Web UI password.
    pub password: String,
    /// Path to the qBittorrent executable.
    pub executable_path: String,
}

/// Torrent client speaking the qBittorrent Web API v2.
#[derive(Debug)]
pub struct QbittorrentClient {
    options: QbittorrentOptions,
    base_url: Url,
    http: Client,
    logged_in: Mutex<bool>,
}

#[derive(Deserialize)]
struct TorrentInfo {
    hash: String,
    name: String,
    #[serde(default)]
    progress: f64,
    state: String,
    #[serde(default)]
    save_path: String,
}

impl QbittorrentClient {
    /// Build a client for the given Web UI.
    ///
    /// # Errors
    ///
    /// Returns an error if host and port do not form a valid URL or the HTTP
    /// client cannot be built.
    pub fn new(options: QbittorrentOptions) -> TorrentResult<Self> {
        let endpoint = format!("http://{}:{}/", options.host, options.port);
        let base_url = Url::parse(&endpoint)
            .map_err(|source| TorrentError::InvalidEndpoint { endpoint, source })?;
        let http = Client::builder()
            .cookie_store(true)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|source| TorrentError::ClientBuild { source })?;
        Ok(Self {
            options,
            base_url,
            http,
            logged_in: Mutex::new(false),
        })
    }

    /// Options the client was built from.
    #[must_use]
    pub const fn options(&self) -> &QbittorrentOptions {
        &self.options
    }

    fn endpoint(&self, path: &str) -> TorrentResult<Url> {
        self.base_url
            .join(path)
            .map_err(|source| TorrentError::InvalidEndpoint {
                endpoint: path.to_string(),
                source,
            })
    }

    #[instrument(name = "qbittorrent.login", skip(self), fields(host = %self.options.host))]
    async fn ensure_session(&self) -> TorrentResult<()> {
        let mut logged_in = self.logged_in.lock().await;
        if *logged_in || self.options.username.is_empty() {
            return Ok(());
        }
        let response = self
            .http
            .post(self.endpoint("api/v2/auth/login")?)
            .header(reqwest::header::REFERER, self.base_url.as_str())
            .form(&[
                ("username", self.options.username.as_str()),
                ("password", self.options.password.as_str()),
            ])
            .send()
            .await
            .map_err(|source| TorrentError::Request {
                operation: "auth.login",
                source,
            })?;
        let status = response.status();
        if status == StatusCode::FORBIDDEN {
            return Err(TorrentError::AuthenticationFailed);
        }
        if !status.is_success() {
            return Err(TorrentError::Status {
                operation: "auth.login",
                status: status.as_u16(),
            });
        }
        let body = response.text().await.map_err(|source| TorrentError::Request {
            operation: "auth.login",
            source,
        })?;
        if body.trim() != LOGIN_OK {
            return Err(TorrentError::AuthenticationFailed);
        }
        debug!("qbittorrent session established");
        *logged_in = true;
        Ok(())
    }

    async fn check_status(
        &self,
        operation: &'static str,
        response: &reqwest::Response,
    ) -> TorrentResult<()> {
        let status = response.status();
        if status == StatusCode::FORBIDDEN {
            warn!(operation, "qbittorrent session rejected; logging in on next request");
            *self.logged_in.lock().await = false;
        }
        if status.is_success() {
            Ok(())
        } else {
            Err(TorrentError::Status {
                operation,
                status: status.as_u16(),
            })
        }
    }
}

#[async_trait]
impl TorrentClient for QbittorrentClient {
    async fn submit(&self, request: AddTorrent) -> TorrentResult<()> {
        self.ensure_session().await?;
        let mut form = vec![("urls", request.source.as_link().to_string())];
        if let Some(save_path) = request.save_path {
            form.push(("savepath", save_path));
        }
        if request.paused {
            form.push(("paused", "true".to_string()));
        }
        let response = self
            .http
            .post(self.endpoint("api/v2/torrents/add")?)
            .form(&form)
            .send()
            .await
            .map_err(|source| TorrentError::Request {
                operation: "torrents.add",
                source,
            })?;
        self.check_status("torrents.add", &response).await
    }

    async fn query(&self) -> TorrentResult<Vec<TorrentSummary>> {
        self.ensure_session().await?;
        let response = self
            .http
            .get(self.endpoint("api/v2/torrents/info")?)
            .send()
            .await
            .map_err(|source| TorrentError::Request {
                operation: "torrents.info",
                source,
            })?;
        self.check_status("torrents.info", &response).await?;
        let torrents: Vec<TorrentInfo> =
            response.json().await.map_err(|source| TorrentError::Request {
                operation: "torrents.info",
                source,
            })?;
        Ok(torrents
            .into_iter()
            .map(|info| TorrentSummary {
                state: TorrentState::from_qbittorrent(&info.state),
                hash: info.hash,
                name: info.name,
                progress: info.progress,
                save_path: info.save_path,
            })
            .collect())
    }

    fn descriptor(&self) -> TorrentClientDescriptor {
        TorrentClientDescriptor {
            kind: "qbittorrent".to_string(),
            host: self.options.host.clone(),
            port: self.options.port,
            username: (!self.options.username.is_empty()).then(|| self.options.username.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TorrentSource;
    use anyhow::Result;
    use httpmock::MockServer;
    use httpmock::prelude::*;

    fn options_for(server: &MockServer, username: &str) -> QbittorrentOptions {
        QbittorrentOptions {
            host: server.host(),
            port: server.port(),
            username: username.to_string(),
            password: "adminadmin".to_string(),
            executable_path: String::new(),
        }
    }

    #[test]
    fn construction_does_not_touch_the_network() -> Result<()> {
        let client = QbittorrentClient::new(QbittorrentOptions {
            host: "127.0.0.1".into(),
            port: 1,
            username: "admin".into(),
            password: "secret".into(),
            executable_path: String::new(),
        })?;
        let descriptor = client.descriptor();
        assert_eq!(descriptor.port, 1);
        assert_eq!(descriptor.username.as_deref(), Some("admin"));
        assert!(!format!("{descriptor:?}").contains("secret"));
        Ok(())
    }

    #[test]
    fn invalid_host_is_rejected() {
        let result = QbittorrentClient::new(QbittorrentOptions {
            host: "bad host".into(),
            port: 8080,
            username: String::new(),
            password: String::new(),
            executable_path: String::new(),
        });
        assert!(matches!(result, Err(TorrentError::InvalidEndpoint { .. })));
    }

    #[tokio::test]
    async fn query_logs_in_once_and_maps_states() -> Result<()> {
        let server = MockServer::start_async().await;
        let login = server.mock(|when, then| {
            when.method(POST).path("/api/v2/auth/login");
            then.status(200)
                .header("set-cookie", "SID=session; path=/")
                .body("Ok.");
        });
        let info = server.mock(|when, then| {
            when.method(GET).path("/api/v2/torrents/info");
            then.status(200).json_body(serde_json::json!([{
                "hash": "abc",
                "name": "Episode 01",
                "progress": 0.5,
                "state": "downloading",
                "save_path": "/downloads"
            }]));
        });

        let client = QbittorrentClient::new(options_for(&server, "admin"))?;
        let torrents = client.query().await?;

        login.assert();
        info.assert();
        assert_eq!(torrents.len(), 1);
        assert_eq!(torrents[0].state, TorrentState::Downloading);
        assert_eq!(torrents[0].save_path, "/downloads");
        Ok(())
    }

    #[tokio::test]
    async fn rejected_credentials_surface_as_authentication_failure() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/api/v2/auth/login");
            then.status(200).body("Fails.");
        });

        let client = QbittorrentClient::new(options_for(&server, "admin"))?;
        let result = client.submit(AddTorrent {
            source: TorrentSource::magnet("magnet:?xt=urn:btih:abc"),
            save_path: None,
            paused: false,
        });
        assert!(matches!(result.await, Err(TorrentError::AuthenticationFailed)));
        Ok(())
    }

    #[tokio::test]
    async fn submit_without_username_skips_login() -> Result<()> {
        let server = MockServer::start_async().await;
        let add = server.mock(|when, then| {
            when.method(POST).path("/api/v2/torrents/add");
            then.status(200).body("Ok.");
        });

        let client = QbittorrentClient::new(options_for(&server, ""))?;
        client
            .submit(AddTorrent {
                source: TorrentSource::magnet("magnet:?xt=urn:btih:def"),
                save_path: Some("/media/anime".into()),
                paused: true,
            })
            .await?;
        add.assert();
        Ok(())
    }
}
