//! Routing decision for HTTP front ends.
//!
//! While the master key is locked, every page except the password pages is
//! redirected: to the unlock form when a key is registered, to the
//! registration form otherwise. This module only decides; serving the
//! redirect is up to the embedding server.

use std::sync::Arc;

use hyper::StatusCode;
use tracing::debug;

use crate::types::Result;

use super::service::MasterKeyService;

/// Page asking for the master password of a registered key.
pub const ASK_PASSWORD_PATH: &str = "/master-password/ask";

/// Page registering a new master password.
pub const REGISTER_PASSWORD_PATH: &str = "/master-password/register";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Serve the request as usual.
    Proceed,
    /// Redirect the client to the given path.
    Redirect(&'static str),
}

impl GateDecision {
    /// Status to answer with: `303 See Other` for redirects.
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            Self::Proceed => None,
            Self::Redirect(_) => Some(StatusCode::SEE_OTHER),
        }
    }

    pub fn location(&self) -> Option<&'static str> {
        match self {
            Self::Proceed => None,
            Self::Redirect(path) => Some(path),
        }
    }
}

pub struct MasterKeyGate<S: ?Sized> {
    service: Arc<S>,
}

impl<S: MasterKeyService + ?Sized> MasterKeyGate<S> {
    pub fn new(service: Arc<S>) -> Self {
        Self { service }
    }

    /// Decide what to do with a request for `path`.
    pub async fn check(&self, path: &str) -> Result<GateDecision> {
        // Registration lookups hit storage, so skip them once unlocked.
        if self.service.is_master_key_loaded() {
            return Ok(GateDecision::Proceed);
        }

        let registered = self.service.is_master_key_registered().await?;

        let decision = if registered && path != ASK_PASSWORD_PATH {
            GateDecision::Redirect(ASK_PASSWORD_PATH)
        } else if !registered && path != REGISTER_PASSWORD_PATH {
            GateDecision::Redirect(REGISTER_PASSWORD_PATH)
        } else {
            GateDecision::Proceed
        };

        debug!(path, registered, ?decision, "Master key gate");
        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::secret::{SealedKey, SecretKey, SecretText};
    use crate::types::WardenError;

    /// Fixed-answer service
    struct StubService {
        loaded: bool,
        registered: Option<bool>,
    }

    #[async_trait]
    impl MasterKeyService for StubService {
        fn is_master_key_loaded(&self) -> bool {
            self.loaded
        }

        async fn is_master_key_registered(&self) -> Result<bool> {
            self.registered
                .ok_or_else(|| WardenError::Storage("database is gone".into()))
        }

        async fn generate_master_key(&self, _passphrase: &SecretText) -> Result<()> {
            unimplemented!()
        }

        async fn load_master_key_from_password(&self, _passphrase: &SecretText) -> Result<()> {
            unimplemented!()
        }

        fn seal_key(&self, _key: &SecretKey) -> Result<SealedKey> {
            unimplemented!()
        }

        fn open(&self, _sealed: &SealedKey) -> Result<SecretKey> {
            unimplemented!()
        }
    }

    fn gate(loaded: bool, registered: Option<bool>) -> MasterKeyGate<StubService> {
        MasterKeyGate::new(Arc::new(StubService { loaded, registered }))
    }

    #[tokio::test]
    async fn test_loaded_always_proceeds() {
        // Storage is never consulted once loaded
        let gate = gate(true, None);

        assert_eq!(gate.check("/").await.unwrap(), GateDecision::Proceed);
        assert_eq!(
            gate.check(ASK_PASSWORD_PATH).await.unwrap(),
            GateDecision::Proceed
        );
    }

    #[tokio::test]
    async fn test_registered_redirects_to_ask() {
        let gate = gate(false, Some(true));

        let decision = gate.check("/browser").await.unwrap();
        assert_eq!(decision, GateDecision::Redirect(ASK_PASSWORD_PATH));
        assert_eq!(decision.status_code(), Some(StatusCode::SEE_OTHER));

        assert_eq!(
            gate.check(ASK_PASSWORD_PATH).await.unwrap(),
            GateDecision::Proceed
        );
        assert_eq!(
            gate.check(REGISTER_PASSWORD_PATH).await.unwrap(),
            GateDecision::Redirect(ASK_PASSWORD_PATH)
        );
    }

    #[tokio::test]
    async fn test_unregistered_redirects_to_register() {
        let gate = gate(false, Some(false));

        let decision = gate.check("/").await.unwrap();
        assert_eq!(decision.location(), Some(REGISTER_PASSWORD_PATH));

        assert_eq!(
            gate.check(REGISTER_PASSWORD_PATH).await.unwrap(),
            GateDecision::Proceed
        );
    }

    #[tokio::test]
    async fn test_lookup_failure_propagates() {
        let gate = gate(false, None);

        let err = gate.check("/").await.unwrap_err();
        assert!(matches!(err, WardenError::Storage(_)));
    }

    #[tokio::test]
    async fn test_works_with_trait_objects() {
        let service: Arc<dyn MasterKeyService> = Arc::new(StubService {
            loaded: false,
            registered: Some(false),
        });
        let gate = MasterKeyGate::new(service);

        assert_eq!(
            gate.check("/").await.unwrap(),
            GateDecision::Redirect(REGISTER_PASSWORD_PATH)
        );
    }
}
