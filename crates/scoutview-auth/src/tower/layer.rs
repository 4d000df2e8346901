//! Tower Layer implementation for authentication

use std::sync::Arc;
use tower::Layer;

use crate::AuthGate;

use super::service::AuthService;

/// Tower Layer that authenticates requests before they reach the inner service
///
/// Cheap to clone: every wrapped service shares the same gate and therefore
/// the same key-set cache.
#[derive(Debug, Clone)]
pub struct AuthLayer {
    gate: Arc<AuthGate>,
}

impl AuthLayer {
    /// Create a layer around `gate`
    pub fn new(gate: AuthGate) -> Self {
        Self {
            gate: Arc::new(gate),
        }
    }

    /// Create a layer from an already shared gate
    pub fn from_arc(gate: Arc<AuthGate>) -> Self {
        Self { gate }
    }

    /// The gate requests are authenticated with
    pub fn gate(&self) -> &Arc<AuthGate> {
        &self.gate
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthService::new(inner, Arc::clone(&self.gate))
    }
}
