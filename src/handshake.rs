use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    error::HandshakeError,
    packet::{Packet, PacketType},
    transport::TransportKind,
};

/// Session parameters carried by the server's open packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    /// Transports the session may upgrade to.
    #[serde(default)]
    pub upgrades: Vec<String>,
    #[serde(rename = "pingInterval")]
    pub ping_interval_ms: u64,
    #[serde(rename = "pingTimeout")]
    pub ping_timeout_ms: u64,
}

impl Handshake {
    pub fn from_packet(packet: &Packet) -> Result<Self, HandshakeError> {
        if packet.kind != PacketType::Open {
            return Err(HandshakeError::NotOpen(packet.kind));
        }
        let json = packet.as_text().ok_or(HandshakeError::MissingData)?;
        let handshake: Self = serde_json::from_str(json)?;
        tracing::info!(
            sid = %handshake.sid,
            upgrades = ?handshake.upgrades,
            ping_interval = handshake.ping_interval_ms,
            ping_timeout = handshake.ping_timeout_ms,
            "handshake"
        );
        Ok(handshake)
    }

    /// The open packet a server would send for this session.
    pub fn to_packet(&self) -> Result<Packet, HandshakeError> {
        Ok(Packet::text(PacketType::Open, serde_json::to_string(self)?))
    }

    #[must_use]
    pub fn ping_interval(&self) -> Duration { Duration::from_millis(self.ping_interval_ms) }

    #[must_use]
    pub fn ping_timeout(&self) -> Duration { Duration::from_millis(self.ping_timeout_ms) }

    /// How long after the last ping the peer may stay silent before the
    /// session counts as dead.
    #[must_use]
    pub fn ping_deadline(&self) -> Duration { self.ping_interval() + self.ping_timeout() }

    #[must_use]
    pub fn can_upgrade(&self, kind: TransportKind) -> bool {
        self.upgrades.iter().any(|u| u == kind.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPEN: &str =
        r#"{"sid":"lv_VI97HAXpY6yYWAAAC","upgrades":["websocket"],"pingInterval":25000,"pingTimeout":5000}"#;

    #[test]
    fn parses_open_packet() {
        let hs = Handshake::from_packet(&Packet::text(PacketType::Open, OPEN)).unwrap();
        assert_eq!(hs.sid, "lv_VI97HAXpY6yYWAAAC");
        assert!(hs.can_upgrade(TransportKind::WebSocket));
        assert!(!hs.can_upgrade(TransportKind::Polling));
        assert_eq!(hs.ping_deadline(), Duration::from_secs(30));
        assert_eq!(Handshake::from_packet(&hs.to_packet().unwrap()).unwrap(), hs);
    }

    #[test]
    fn missing_upgrades_defaults_to_none() {
        let json = r#"{"sid":"a","pingInterval":1,"pingTimeout":2}"#;
        let hs = Handshake::from_packet(&Packet::text(PacketType::Open, json)).unwrap();
        assert!(hs.upgrades.is_empty());
    }

    #[test]
    fn rejects_other_packets() {
        assert!(matches!(
            Handshake::from_packet(&Packet::message(OPEN)),
            Err(HandshakeError::NotOpen(PacketType::Message))
        ));
        assert!(matches!(
            Handshake::from_packet(&Packet::new(PacketType::Open)),
            Err(HandshakeError::MissingData)
        ));
        assert!(matches!(
            Handshake::from_packet(&Packet::text(PacketType::Open, "{")),
            Err(HandshakeError::Json(_))
        ));
    }
}
