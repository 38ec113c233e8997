//! Relay endpoint configuration.

use crate::error::{ClientError, Result};
use std::fmt;
use url::Url;

/// A relay WebSocket endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RelayEndpoint {
    url: Url,
}

impl RelayEndpoint {
    /// Parse and validate a relay URL.
    pub fn parse(url: &str) -> Result<Self> {
        let url = Url::parse(url)?;

        if url.scheme() != "ws" && url.scheme() != "wss" {
            return Err(ClientError::InvalidUrl(format!(
                "URL must use ws:// or wss:// scheme, got: {}",
                url.scheme()
            )));
        }

        Ok(Self { url })
    }

    /// Parse a list of relay URLs, failing on the first invalid one.
    pub fn parse_all<S: AsRef<str>>(urls: &[S]) -> Result<Vec<Self>> {
        urls.iter().map(|u| Self::parse(u.as_ref())).collect()
    }

    /// The URL as a string.
    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }
}

impl fmt::Display for RelayEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
