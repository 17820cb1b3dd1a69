use std::sync::Arc;

use tokio::sync::RwLock;

/// Holder for the bearer token the session layer obtained at login.
///
/// Clones share the same slot, so the session layer sees the gateway clear it on expiry.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    token: Arc<RwLock<Option<String>>>,
}

impl Credentials {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: Arc::new(RwLock::new(token.filter(|t| !t.is_empty()))),
        }
    }

    pub async fn retrieve(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    pub async fn clear(&self) {
        if self.token.write().await.take().is_some() {
            tracing::info!("Cleared stored session token");
        }
    }

    /// `Authorization` header value, if a token is held.
    pub async fn bearer(&self) -> Option<String> {
        self.retrieve().await.map(|t| format!("Bearer {}", t))
    }
}
