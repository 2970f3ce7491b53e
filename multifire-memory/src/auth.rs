//! In-memory authentication client.

use async_trait::async_trait;
use mea::rwlock::RwLock;
use std::any::Any;
use tracing::debug;
use uuid::Uuid;

use multifire_core::{
    backend::{AuthBackend, AuthUser},
    error::FirebaseResult,
};

/// Tracks the signed-in user of one app.
#[derive(Debug, Default)]
pub struct InMemoryAuth {
    user: RwLock<Option<AuthUser>>,
}

impl InMemoryAuth {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuthBackend for InMemoryAuth {
    async fn current_user(&self) -> FirebaseResult<Option<AuthUser>> {
        Ok(self.user.read().await.clone())
    }

    async fn sign_in_anonymously(&self) -> FirebaseResult<AuthUser> {
        let mut current = self.user.write().await;

        if let Some(user) = current.as_ref().filter(|user| user.anonymous) {
            return Ok(user.clone());
        }

        let user = AuthUser {
            uid: Uuid::new_v4().simple().to_string(),
            anonymous: true,
        };
        debug!(uid = %user.uid, "signed in anonymously");

        *current = Some(user.clone());
        Ok(user)
    }

    async fn sign_out(&self) -> FirebaseResult<()> {
        self.user.write().await.take();
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
