//! Authentication and Connection State
//!
//! Alpaca's market data stream requires authentication immediately after
//! the socket opens: the client sends `{"action":"auth","key":…,
//! "secret":…}` and waits for a frame whose first element carries
//! `{"msg":"authenticated"}`. Connections that never authenticate are
//! dropped by the server.

use super::messages::AuthRequest;

// =============================================================================
// Connection State
// =============================================================================

/// Lifecycle state of the upstream connection.
///
/// Exactly one instance exists per client, owned by the connection task.
/// Consumers never observe it directly; the facade only reads it to decide
/// whether a subscribe frame can be sent immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No socket, and no connect in flight.
    #[default]
    Disconnected,

    /// Socket connect in progress.
    Connecting,

    /// Socket open, auth frame sent, awaiting confirmation.
    AwaitingAuth,

    /// Authentication confirmed; subscriptions may be sent.
    Authenticated,
}

impl ConnectionState {
    /// Check if the connection is authenticated and ready for traffic.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated)
    }

    /// Check if a socket exists (open or opening).
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !matches!(self, Self::Disconnected)
    }
}

// =============================================================================
// Credentials
// =============================================================================

/// Alpaca API credentials.
///
/// The `Debug` implementation redacts the secret for safe logging.
#[derive(Clone)]
pub struct Credentials {
    key: String,
    secret: String,
}

impl Credentials {
    /// Create new credentials.
    #[must_use]
    pub fn new(key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            secret: secret.into(),
        }
    }

    /// Get the API key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Get the API secret.
    #[must_use]
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Build the authentication frame for this key pair.
    #[must_use]
    pub fn to_auth_request(&self) -> AuthRequest {
        AuthRequest::new(self.key.clone(), self.secret.clone())
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("key", &self.key)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_is_disconnected() {
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
    }

    #[test]
    fn state_predicates() {
        assert!(!ConnectionState::Disconnected.is_active());
        assert!(ConnectionState::Connecting.is_active());
        assert!(ConnectionState::AwaitingAuth.is_active());
        assert!(ConnectionState::Authenticated.is_active());

        assert!(ConnectionState::Authenticated.is_authenticated());
        assert!(!ConnectionState::AwaitingAuth.is_authenticated());
        assert!(!ConnectionState::Connecting.is_authenticated());
        assert!(!ConnectionState::Disconnected.is_authenticated());
    }

    #[test]
    fn debug_redacts_secret() {
        let creds = Credentials::new("my_key", "super_secret");
        let debug = format!("{creds:?}");
        assert!(debug.contains("my_key"));
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("super_secret"));
    }

    #[test]
    fn auth_request_carries_key_pair() {
        let creds = Credentials::new("k", "s");
        let request = creds.to_auth_request();
        assert_eq!(request.key, "k");
        assert_eq!(request.secret, "s");
    }
}
