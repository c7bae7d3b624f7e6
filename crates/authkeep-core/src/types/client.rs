//! Client metadata recorded alongside issued sessions.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

/// User-agent and address of the client making a request, kept for audit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientMeta {
    /// Raw `User-Agent` value, if the transport supplied one.
    pub user_agent: Option<String>,
    /// Remote address of the client.
    pub ip_address: Option<IpAddr>,
}

impl ClientMeta {
    /// Create client metadata from optional parts.
    pub fn new(user_agent: Option<String>, ip_address: Option<IpAddr>) -> Self {
        Self {
            user_agent,
            ip_address,
        }
    }

    /// Returns true if nothing is known about the client.
    pub fn is_empty(&self) -> bool {
        self.user_agent.is_none() && self.ip_address.is_none()
    }
}
