//! HTTP calls to the backend.
//!
//! `/startup` and `/end_session` are fire-and-forget: the request is spawned
//! on the current runtime and its outcome is only logged. Nothing retries,
//! and a failed request leaves the local session state as if it succeeded.
//! `/get_goal` is awaited because its body is shown to the user.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::WandError;
use crate::protocol::{EndSessionRequest, StartupRequest};
use crate::session::SessionId;

/// Session lifecycle requests. Implementations must not block.
pub trait SessionBackend {
    fn startup(&self, req: StartupRequest);
    fn end_session(&self, req: EndSessionRequest);
}

#[derive(Debug, Clone)]
pub struct HttpBackend {
    base_url: String,
    client: reqwest::Client,
    in_flight: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl HttpBackend {
    pub fn new(config: &ClientConfig) -> Result<Self, WandError> {
        Self::with_timeouts(
            config.backend_base()?,
            config.connect_timeout(),
            config.request_timeout(),
        )
    }

    pub fn with_timeouts(
        base_url: impl Into<String>,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, WandError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()
            .map_err(|e| WandError::Connect {
                url: base_url.clone(),
                detail: e.to_string(),
            })?;
        Ok(HttpBackend {
            base_url,
            client,
            in_flight: Arc::new(Mutex::new(Vec::new())),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the markdown goal text for a session from `/get_goal`.
    ///
    /// # Returns
    /// - `Ok(text)` on a 2xx response.
    /// - `Err(WandError::Connect)` when the request cannot be sent.
    /// - `Err(WandError::Http)` on a non-2xx response.
    pub async fn fetch_goal(&self, id: &SessionId) -> Result<String, WandError> {
        let url = format!("{}/get_goal", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(&[("id", id.as_str())])
            .send()
            .await
            .map_err(|e| WandError::Connect {
                url: url.clone(),
                detail: e.to_string(),
            })?;

        if !resp.status().is_success() {
            return Err(WandError::Http {
                status: resp.status().as_u16(),
                url,
            });
        }

        resp.text().await.map_err(|e| WandError::Connect {
            url,
            detail: e.to_string(),
        })
    }

    fn post_detached<T: Serialize + Send + Sync + 'static>(&self, path: &'static str, body: T) {
        let url = format!("{}{}", self.base_url, path);
        let client = self.client.clone();
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!(url = %url, "no async runtime, request not sent");
                return;
            }
        };
        let task = runtime.spawn(async move {
            match post_json(&client, &url, &body).await {
                Ok(()) => debug!(url = %url, "request delivered"),
                Err(e) => warn!(error = %e, "fire-and-forget request failed, session state unchanged"),
            }
        });
        if let Ok(mut guard) = self.in_flight.lock() {
            guard.retain(|t| !t.is_finished());
            guard.push(task);
        }
    }

    /// Give requests still in flight up to `grace` to finish. Used before
    /// the process exits so a final `/end_session` is not cut off.
    pub async fn flush(&self, grace: Duration) {
        let pending: Vec<JoinHandle<()>> = match self.in_flight.lock() {
            Ok(mut guard) => guard.drain(..).collect(),
            Err(_) => return,
        };
        if pending.is_empty() {
            return;
        }
        let all = async move {
            for task in pending {
                let _ = task.await;
            }
        };
        if tokio::time::timeout(grace, all).await.is_err() {
            warn!("pending requests abandoned at shutdown");
        }
    }
}

async fn post_json<T: Serialize>(client: &reqwest::Client, url: &str, body: &T) -> Result<(), WandError> {
    let resp = client
        .post(url)
        .json(body)
        .send()
        .await
        .map_err(|e| WandError::Connect {
            url: url.to_string(),
            detail: e.to_string(),
        })?;
    if !resp.status().is_success() {
        return Err(WandError::Http {
            status: resp.status().as_u16(),
            url: url.to_string(),
        });
    }
    Ok(())
}

impl SessionBackend for HttpBackend {
    fn startup(&self, req: StartupRequest) {
        debug!(session_id = %req.id, mode = %req.mode, "POST /startup");
        self.post_detached("/startup", req);
    }

    fn end_session(&self, req: EndSessionRequest) {
        debug!(session_id = %req.id, "POST /end_session");
        self.post_detached("/end_session", req);
    }
}
