//! Route changes requested by the core.

use std::sync::Mutex;

pub mod routes {
    /// Login entry point.
    pub const LOGIN: &str = "/auth/login";
    /// OAuth callback that receives the issued credential.
    pub const AUTH_CALLBACK: &str = "/auth/callback";
    pub const AUTH_ERROR: &str = "/auth/error";
    /// Authenticated landing route.
    pub const HOME: &str = "/";
}

pub trait Navigator: Send + Sync {
    fn navigate(&self, route: &str);
}

/// Remembers every route it was asked to visit.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    visited: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visited(&self) -> Vec<String> {
        self.visited
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn last(&self) -> Option<String> {
        self.visited().pop()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: &str) {
        self.visited
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(route.to_string());
    }
}
