//! Client configuration.
//!
//! Loaded from an optional TOML file; every field has a default matching
//! the deployed experiment (page on port 3000, backend on port 8000). The
//! `WAND_BACKEND_URL` environment variable overrides the derived backend
//! address.
//!
//! ```toml
//! [backend]
//! page_origin = "http://127.0.0.1:3000"
//! backend_port = 8000
//!
//! [render]
//! highlight_base = "#4682b4"
//! ```

use std::path::Path;
use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::WandError;
use crate::render::{Rgb, DEFAULT_HIGHLIGHT_BASE};

pub const BACKEND_URL_ENV: &str = "WAND_BACKEND_URL";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub backend: BackendConfig,
    pub render: RenderConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Origin the client was launched from.
    pub page_origin: String,
    /// Replaces the page origin's port.
    pub backend_port: u16,
    /// Explicit backend base URL. Skips origin derivation when set.
    pub url: Option<String>,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            page_origin: "http://127.0.0.1:3000".to_string(),
            backend_port: 8000,
            url: None,
            connect_timeout_secs: 3,
            request_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub highlight_base: String,
    pub color: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            highlight_base: DEFAULT_HIGHLIGHT_BASE.to_hex(),
            color: true,
        }
    }
}

impl ClientConfig {
    /// Load from `path`, or defaults when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self, WandError> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| WandError::ConfigRead {
                    path: path.display().to_string(),
                    detail: e.to_string(),
                })?;
                Self::from_toml_str(&text)?
            }
            None => Self::default(),
        };
        if let Ok(url) = std::env::var(BACKEND_URL_ENV) {
            if !url.trim().is_empty() {
                config.backend.url = Some(url.trim().to_string());
            }
        }
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, WandError> {
        let config: Self = toml::from_str(text).map_err(|e| WandError::ConfigParse(e.to_string()))?;
        config.highlight_base()?;
        Ok(config)
    }

    /// Base URL for HTTP calls, without a trailing slash.
    pub fn backend_base(&self) -> Result<String, WandError> {
        match &self.backend.url {
            Some(url) => {
                Url::parse(url).map_err(|e| WandError::invalid_url(url, e))?;
                Ok(url.trim_end_matches('/').to_string())
            }
            None => derive_backend_base(&self.backend.page_origin, self.backend.backend_port),
        }
    }

    /// Socket.IO websocket endpoint on the backend.
    pub fn socket_url(&self) -> Result<String, WandError> {
        let base = self.backend_base()?;
        let mut url = Url::parse(&base).map_err(|e| WandError::invalid_url(&base, e))?;
        let scheme = match url.scheme() {
            "https" => "wss",
            "http" => "ws",
            other => other,
        }
        .to_string();
        url.set_scheme(&scheme)
            .map_err(|_| WandError::invalid_url(&base, format!("cannot switch scheme to {scheme}")))?;
        let path = format!("{}/socket.io/", url.path().trim_end_matches('/'));
        url.set_path(&path);
        url.set_query(Some("EIO=4&transport=websocket"));
        Ok(url.to_string())
    }

    pub fn highlight_base(&self) -> Result<Rgb, WandError> {
        Rgb::from_hex(&self.render.highlight_base)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.backend.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.backend.request_timeout_secs)
    }
}

/// Same host as the page, backend port instead of the page port.
///
/// `http://host:3000` becomes `http://host:8000`. An origin with some other
/// explicit port has it replaced; an origin without a port gets one. A bare
/// `host:port` is read as `http`.
pub fn derive_backend_base(origin: &str, backend_port: u16) -> Result<String, WandError> {
    let origin = origin.trim();
    let text = if origin.contains("://") {
        origin.to_string()
    } else {
        format!("http://{origin}")
    };
    let mut url = Url::parse(&text).map_err(|e| WandError::invalid_url(origin, e))?;
    url.set_port(Some(backend_port))
        .map_err(|_| WandError::invalid_url(origin, "origin cannot carry a port"))?;
    let base = url.origin();
    if !base.is_tuple() {
        return Err(WandError::invalid_url(origin, "origin has no host"));
    }
    Ok(base.ascii_serialization())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("http://127.0.0.1:3000", "http://127.0.0.1:8000")]
    #[case("http://127.0.0.1:3000/", "http://127.0.0.1:8000")]
    #[case("https://wand.example.org:3000", "https://wand.example.org:8000")]
    #[case("http://localhost", "http://localhost:8000")]
    #[case("http://localhost:5173", "http://localhost:8000")]
    #[case("localhost:3000", "http://localhost:8000")]
    #[case("http://[::1]:3000", "http://[::1]:8000")]
    #[case("http://host:3000/app?mode=2", "http://host:8000")]
    fn test_derive_backend_base(#[case] origin: &str, #[case] expected: &str) {
        assert_eq!(derive_backend_base(origin, 8000).unwrap(), expected);
    }

    #[rstest]
    #[case("http://")]
    #[case("http://host:3000:4000")]
    fn test_derive_backend_base_rejects_bad_origin(#[case] origin: &str) {
        assert!(matches!(
            derive_backend_base(origin, 8000),
            Err(WandError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.backend_base().unwrap(), "http://127.0.0.1:8000");
        assert_eq!(
            config.socket_url().unwrap(),
            "ws://127.0.0.1:8000/socket.io/?EIO=4&transport=websocket"
        );
        assert_eq!(config.highlight_base().unwrap(), DEFAULT_HIGHLIGHT_BASE);
        assert_eq!(config.connect_timeout(), Duration::from_secs(3));
        assert!(config.render.color);
    }

    #[test]
    fn test_explicit_url_wins_and_maps_to_wss() {
        let mut config = ClientConfig::default();
        config.backend.url = Some("https://api.example.org/".into());
        assert_eq!(config.backend_base().unwrap(), "https://api.example.org");
        assert_eq!(
            config.socket_url().unwrap(),
            "wss://api.example.org/socket.io/?EIO=4&transport=websocket"
        );
    }

    #[test]
    fn test_socket_url_keeps_backend_path_prefix() {
        let mut config = ClientConfig::default();
        config.backend.url = Some("http://10.0.0.2:8000/wand/".into());
        assert_eq!(
            config.socket_url().unwrap(),
            "ws://10.0.0.2:8000/wand/socket.io/?EIO=4&transport=websocket"
        );
    }

    #[test]
    fn test_unparsable_backend_url_rejected() {
        let mut config = ClientConfig::default();
        config.backend.url = Some("not a url".into());
        assert!(matches!(config.backend_base(), Err(WandError::InvalidUrl { .. })));
        assert!(config.socket_url().is_err());
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let config = ClientConfig::from_toml_str(
            r##"
            [backend]
            backend_port = 9000

            [render]
            highlight_base = "#ff0000"
            "##,
        )
        .unwrap();
        assert_eq!(config.backend.backend_port, 9000);
        assert_eq!(config.backend.page_origin, "http://127.0.0.1:3000");
        assert_eq!(config.backend_base().unwrap(), "http://127.0.0.1:9000");
        assert_eq!(config.highlight_base().unwrap(), Rgb::new(255, 0, 0));
    }

    #[test]
    fn test_bad_color_rejected_at_load() {
        let err = ClientConfig::from_toml_str("[render]\nhighlight_base = \"blue\"\n").unwrap_err();
        assert!(matches!(err, WandError::ConfigParse(_)));
    }

    #[test]
    fn test_bad_toml_rejected() {
        assert!(matches!(
            ClientConfig::from_toml_str("[backend\n"),
            Err(WandError::ConfigParse(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wand.toml");
        std::fs::write(&path, "[backend]\npage_origin = \"http://10.0.0.5:3000\"\n").unwrap();
        let config = ClientConfig::load(Some(&path)).unwrap();
        assert_eq!(config.backend.page_origin, "http://10.0.0.5:3000");
    }

    #[test]
    fn test_load_missing_file_is_read_error() {
        let err = ClientConfig::load(Some(Path::new("/nonexistent/wand.toml"))).unwrap_err();
        assert!(matches!(err, WandError::ConfigRead { .. }));
    }
}
