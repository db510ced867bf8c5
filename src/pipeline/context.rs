//! Per-request state owned by the pipeline.

use std::sync::Arc;

use anyhow::anyhow;
use axum::http::HeaderMap;
use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard};
use uuid::Uuid;

use crate::error::Failure;
use crate::repos::session::SessionProvider;
use crate::services::auth::Principal;

/// Identity established for the current request, as handed to handlers.
#[derive(Debug, Clone, Default)]
pub struct Identity(pub Option<Principal>);

impl Identity {
    pub fn principal(&self) -> Option<&Principal> {
        self.0.as_ref()
    }

    pub fn is_anonymous(&self) -> bool {
        self.0.is_none()
    }
}

enum Slot<S> {
    Vacant,
    Held(S),
    Released,
}

struct Shared<P: SessionProvider> {
    provider: Arc<P>,
    slot: Mutex<Slot<P::Session>>,
}

// Reached with a held session only when the request future is dropped before
// finalization (transport timeout, client disconnect).
impl<P: SessionProvider> Drop for Shared<P> {
    fn drop(&mut self) {
        let Slot::Held(session) = std::mem::replace(self.slot.get_mut(), Slot::Released) else {
            return;
        };

        tracing::warn!("request abandoned before finalization, releasing storage session");
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let provider = Arc::clone(&self.provider);
                runtime.spawn(async move { provider.release(session).await });
            }
            Err(_) => {
                tracing::error!("no runtime to release storage session on, dropping it");
                drop(session);
            }
        }
    }
}

/// Handle to the request-scoped storage session.
///
/// The session is acquired lazily on the first `get` and released by the
/// pipeline once the response is final. Clones share the same slot; if the
/// last clone goes away while a session is still held, release is spawned
/// onto the runtime instead.
pub struct SessionHandle<P: SessionProvider> {
    shared: Arc<Shared<P>>,
}

impl<P: SessionProvider> Clone for SessionHandle<P> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<P: SessionProvider> SessionHandle<P> {
    pub(crate) fn new(provider: Arc<P>) -> Self {
        Self {
            shared: Arc::new(Shared {
                provider,
                slot: Mutex::new(Slot::Vacant),
            }),
        }
    }

    /// Borrow the session, acquiring it from the provider on first use.
    pub async fn get(&self) -> Result<MappedMutexGuard<'_, P::Session>, Failure> {
        let mut slot = self.shared.slot.lock().await;
        if let Slot::Vacant = *slot {
            let session = self.shared.provider.acquire().await?;
            tracing::debug!("storage session acquired");
            *slot = Slot::Held(session);
        }

        MutexGuard::try_map(slot, |slot| match slot {
            Slot::Held(session) => Some(session),
            _ => None,
        })
        .map_err(|_| Failure::Internal(anyhow!("storage session used after release")))
    }

    pub async fn is_acquired(&self) -> bool {
        matches!(*self.shared.slot.lock().await, Slot::Held(_))
    }

    /// Hand the session back to the provider. Only the first call after an
    /// acquisition does anything; returns whether a session was released.
    pub(crate) async fn release(&self) -> bool {
        let mut slot = self.shared.slot.lock().await;
        match std::mem::replace(&mut *slot, Slot::Released) {
            Slot::Held(session) => {
                self.shared.provider.release(session).await;
                true
            }
            Slot::Vacant | Slot::Released => false,
        }
    }
}

/// Mutable state of one request: never shared between requests.
pub struct RequestContext<P: SessionProvider> {
    id: String,
    principal: Option<Principal>,
    response_headers: HeaderMap,
    session: SessionHandle<P>,
}

impl<P: SessionProvider> RequestContext<P> {
    /// `request_id` is normally the inbound `x-request-id`.
    pub fn new(request_id: Option<&str>, provider: Arc<P>) -> Self {
        Self {
            id: request_id
                .map(str::to_owned)
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            principal: None,
            response_headers: HeaderMap::new(),
            session: SessionHandle::new(provider),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    pub fn set_principal(&mut self, principal: Option<Principal>) {
        self.principal = principal;
    }

    pub fn identity(&self) -> Identity {
        Identity(self.principal.clone())
    }

    pub fn response_headers(&self) -> &HeaderMap {
        &self.response_headers
    }

    pub fn response_headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.response_headers
    }

    pub fn session(&self) -> &SessionHandle<P> {
        &self.session
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::repos::error::{RepoError, RepoResult};

    #[derive(Default)]
    struct Counting {
        acquired: AtomicUsize,
        released: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl SessionProvider for Counting {
        type Session = usize;

        async fn acquire(&self) -> RepoResult<usize> {
            if self.fail {
                return Err(RepoError::Db(sqlx::Error::PoolTimedOut));
            }
            Ok(self.acquired.fetch_add(1, Ordering::SeqCst) + 1)
        }

        async fn release(&self, _session: usize) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn session_is_acquired_once_and_released_once() {
        let provider = Arc::new(Counting::default());
        let handle = SessionHandle::new(Arc::clone(&provider));

        assert!(!handle.is_acquired().await);
        assert_eq!(*handle.get().await.expect("session"), 1);
        assert_eq!(*handle.clone().get().await.expect("session"), 1);
        assert!(handle.is_acquired().await);

        assert!(handle.release().await);
        assert!(!handle.release().await);

        assert_eq!(provider.acquired.load(Ordering::SeqCst), 1);
        assert_eq!(provider.released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn untouched_session_is_never_acquired() {
        let provider = Arc::new(Counting::default());
        let handle = SessionHandle::new(Arc::clone(&provider));

        assert!(!handle.release().await);
        assert_eq!(provider.acquired.load(Ordering::SeqCst), 0);
        assert_eq!(provider.released.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn session_cannot_be_used_after_release() {
        let handle = SessionHandle::new(Arc::new(Counting::default()));
        handle.get().await.expect("session");
        handle.release().await;

        assert!(matches!(handle.get().await, Err(Failure::Internal(_))));
    }

    #[tokio::test]
    async fn acquire_failure_is_a_storage_failure() {
        let provider = Arc::new(Counting {
            fail: true,
            ..Counting::default()
        });
        let handle = SessionHandle::new(provider);

        assert!(matches!(handle.get().await, Err(Failure::Storage(_))));
        assert!(!handle.is_acquired().await);
    }

    #[tokio::test]
    async fn dropping_a_held_session_releases_it() {
        let provider = Arc::new(Counting::default());
        let handle = SessionHandle::new(Arc::clone(&provider));
        handle.get().await.expect("session");
        let clone = handle.clone();

        drop(handle);
        tokio::task::yield_now().await;
        assert_eq!(provider.released.load(Ordering::SeqCst), 0);

        drop(clone);
        tokio::task::yield_now().await;
        assert_eq!(provider.released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn dropping_after_release_does_not_release_again() {
        let provider = Arc::new(Counting::default());
        let handle = SessionHandle::new(Arc::clone(&provider));
        handle.get().await.expect("session");

        assert!(handle.release().await);
        drop(handle);
        tokio::task::yield_now().await;

        assert_eq!(provider.released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn request_id_falls_back_to_uuid() {
        let ctx = RequestContext::new(None, Arc::new(Counting::default()));
        assert!(Uuid::parse_str(ctx.id()).is_ok());

        let ctx = RequestContext::new(Some("abc-123"), Arc::new(Counting::default()));
        assert_eq!(ctx.id(), "abc-123");
        assert!(ctx.principal().is_none());
    }
}
