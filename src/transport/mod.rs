//! Seams to the I/O layers the codecs sit between.

mod assemble;
mod polling;
mod socket;

use std::time::{SystemTime, UNIX_EPOCH};

use url::Url;

pub use assemble::{Message, MessageAssembler};
pub use polling::{Poller, PollingTransport};
pub use socket::{packet_from_frame, read_frames, read_packets, write_packet};

use crate::{PROTOCOL, packet::BinarySupport, payload::PayloadEncoding};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Polling,
    WebSocket,
}

impl TransportKind {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Polling => "polling",
            Self::WebSocket => "websocket",
        }
    }
}

/// How transports address the server and what they can carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportOptions {
    /// Endpoint path joined onto the base URL.
    pub path: String,
    /// Ask polling responses to carry binary data as base64 text.
    pub force_base64: bool,
    /// Query parameter for a cache-busting timestamp, if any.
    pub timestamp_param: Option<String>,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            path: "/engine.io/".to_owned(),
            force_base64: false,
            timestamp_param: Some("t".to_owned()),
        }
    }
}

impl TransportOptions {
    #[must_use]
    pub fn binary_support(&self, kind: TransportKind) -> BinarySupport {
        match kind {
            TransportKind::Polling if self.force_base64 => BinarySupport::Base64,
            _ => BinarySupport::Binary,
        }
    }

    #[must_use]
    pub fn payload_encoding(&self, kind: TransportKind) -> PayloadEncoding {
        PayloadEncoding::for_transport(self.binary_support(kind))
    }

    /// Builds the request URL for `kind` from an `http(s)` base.
    ///
    /// WebSocket URLs switch the scheme to `ws(s)`.
    pub fn url(&self, base: &Url, kind: TransportKind, sid: Option<&str>) -> Result<Url, url::ParseError> {
        let mut url = base.join(&self.path)?;

        if kind == TransportKind::WebSocket {
            let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
            // http(s) -> ws(s) stays within the special schemes, so this cannot fail
            let _ = url.set_scheme(scheme);
        }

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("EIO", &PROTOCOL.to_string());
            query.append_pair("transport", kind.name());
            if let Some(sid) = sid {
                query.append_pair("sid", sid);
            }
            if self.binary_support(kind) == BinarySupport::Base64 {
                query.append_pair("b64", "1");
            }
            if let (TransportKind::Polling, Some(param)) = (kind, &self.timestamp_param) {
                let millis = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_millis())
                    .unwrap_or_default();
                query.append_pair(param, &millis.to_string());
            }
        }

        tracing::debug!(%url, "transport url");
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(url: &Url) -> Vec<(String, String)> { url.query_pairs().into_owned().collect() }

    fn pairs(expected: &[(&str, &str)]) -> Vec<(String, String)> {
        expected
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn polling_url() {
        let base = Url::parse("https://example.com").unwrap();
        let opts = TransportOptions {
            force_base64: true,
            timestamp_param: None,
            ..TransportOptions::default()
        };
        let url = opts.url(&base, TransportKind::Polling, Some("abc")).unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.path(), "/engine.io/");
        assert_eq!(
            query(&url),
            pairs(&[
                ("EIO", "3"),
                ("transport", "polling"),
                ("sid", "abc"),
                ("b64", "1"),
            ])
        );
    }

    #[test]
    fn websocket_url_switches_scheme() {
        let base = Url::parse("https://example.com/app/").unwrap();
        let opts = TransportOptions::default();
        let url = opts.url(&base, TransportKind::WebSocket, None).unwrap();
        assert_eq!(url.scheme(), "wss");
        assert_eq!(
            query(&url),
            pairs(&[("EIO", "3"), ("transport", "websocket")])
        );

        let url = opts
            .url(&Url::parse("http://localhost:3000").unwrap(), TransportKind::WebSocket, None)
            .unwrap();
        assert_eq!(url.scheme(), "ws");
    }

    #[test]
    fn polling_timestamp_is_added() {
        let base = Url::parse("http://localhost").unwrap();
        let url = TransportOptions::default()
            .url(&base, TransportKind::Polling, None)
            .unwrap();
        assert!(query(&url).iter().any(|(k, _)| k == "t"));
    }

    #[test]
    fn websocket_always_carries_binary() {
        let opts = TransportOptions {
            force_base64: true,
            ..TransportOptions::default()
        };
        assert_eq!(opts.binary_support(TransportKind::WebSocket), BinarySupport::Binary);
        assert_eq!(opts.payload_encoding(TransportKind::Polling), PayloadEncoding::Text);
    }
}
