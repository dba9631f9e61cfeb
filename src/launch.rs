//! Launch parameters carried by the experiment link.
//!
//! Participants arrive through a link like
//! `http://host:3000/?mode=2&pid=P017`. `mode` selects the experiment
//! condition and is passed to the backend untouched; `pid` is the
//! participant identifier, shown on the end screen and used as the default
//! session code. Neither is validated.

use reqwest::Url;

use crate::error::WandError;

/// Base used to read a bare query string through the URL parser.
const QUERY_BASE: &str = "http://localhost/";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchParams {
    pub mode: Option<String>,
    pub pid: Option<String>,
    /// `scheme://host[:port]` of the link, when one was given.
    pub origin: Option<String>,
}

impl LaunchParams {
    /// Parse a full link. A fragment is never read as query.
    ///
    /// # Returns
    /// - `Err(WandError::InvalidUrl)` when `url` is not an absolute URL.
    pub fn from_url(url: &str) -> Result<Self, WandError> {
        let parsed = Url::parse(url.trim()).map_err(|e| WandError::invalid_url(url, e))?;
        let origin = parsed.origin();
        let mut params = Self::from_parsed(&parsed);
        params.origin = origin.is_tuple().then(|| origin.ascii_serialization());
        Ok(params)
    }

    /// Parse a bare query string (`mode=2&pid=P017`, leading `?` optional).
    pub fn from_query(query: &str) -> Self {
        match Url::parse(QUERY_BASE) {
            Ok(mut base) => {
                base.set_query(Some(query.trim_start_matches('?')));
                Self::from_parsed(&base)
            }
            Err(_) => Self::default(),
        }
    }

    fn from_parsed(url: &Url) -> Self {
        LaunchParams {
            mode: first_value(url, "mode"),
            pid: first_value(url, "pid"),
            origin: None,
        }
    }

    /// Session code used when none is given explicitly.
    pub fn default_code(&self) -> String {
        self.pid.clone().unwrap_or_default()
    }
}

/// First value for `key`, percent- and `+`-decoded. Later duplicates are
/// ignored, as a browser's `URLSearchParams::get` does.
fn first_value(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}
