//! Session configuration.
//!
//! # Platforms
//!
//! A server session renders a page and hands its history to the client, so
//! it has to see every mutation from the first one: server sessions start
//! capturing immediately. A client session stays idle until its lifecycle
//! has finished replaying (or rebuilding) and calls `capture()` explicitly.

use crate::id::PageSeed;

/// Where the session runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Platform {
    #[default]
    Client,
    Server,
}

/// Configuration for a [`Session`](crate::session::Session).
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub platform: Platform,
    /// Seed for deterministic element ids; must match between the server
    /// render and the client hydration of the same page.
    pub seed: PageSeed,
    /// Start in the capturing state.
    pub capture_on_start: bool,
}

impl SessionConfig {
    /// Client session for a page (idle until `capture()`).
    pub fn client(path: &str) -> Self {
        Self {
            platform: Platform::Client,
            seed: PageSeed::from_path(path),
            capture_on_start: false,
        }
    }

    /// Server session for a page (capturing from the start).
    pub fn server(path: &str) -> Self {
        Self {
            platform: Platform::Server,
            seed: PageSeed::from_path(path),
            capture_on_start: true,
        }
    }

    /// Same settings, but idle on start. Replay builds its session this way.
    pub fn idle(mut self) -> Self {
        self.capture_on_start = false;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            platform: Platform::Client,
            seed: PageSeed::zero(),
            capture_on_start: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        let server = SessionConfig::server("/a");
        assert_eq!(server.platform, Platform::Server);
        assert!(server.capture_on_start);
        assert!(!server.clone().idle().capture_on_start);

        let client = SessionConfig::client("/a");
        assert!(!client.capture_on_start);
        assert_eq!(client.seed, server.seed);
    }
}
