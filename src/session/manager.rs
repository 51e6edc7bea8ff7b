use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex, PoisonError,
};

use log::{debug, error, info, warn};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tokio::{runtime::Handle, sync::watch};
use validator::Validate;

use crate::{
    auth::{claims::Identity, jwt::CredentialDecoder},
    config::{Config, SessionSettings},
    errors::{AppError, AppResult},
    models::dto::request::RegisterRequest,
    services::auth_client::AuthApi,
};

use super::{
    clock::{Clock, SystemClock},
    scheduler::{spawn_check_loop, ScheduledCheck},
    storage::CredentialStorage,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Unauthenticated,
    Authenticated,
    Refreshing,
}

/// What observers see after every transition.
#[derive(Clone, Debug)]
pub struct SessionSnapshot {
    status: SessionStatus,
    identity: Option<Identity>,
    credential: Option<SecretString>,
    // Bumped whenever the credential is replaced or cleared
    generation: u64,
}

impl SessionSnapshot {
    fn unauthenticated() -> Self {
        Self {
            status: SessionStatus::Unauthenticated,
            identity: None,
            credential: None,
            generation: 0,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    /// Drops back from `Refreshing` when an exchange was abandoned.
    pub(super) fn settle_refreshing(&mut self) -> bool {
        if self.status == SessionStatus::Refreshing {
            self.status = SessionStatus::Authenticated;
            true
        } else {
            false
        }
    }
}

pub(super) struct SessionInner {
    pub(super) storage: Arc<dyn CredentialStorage>,
    pub(super) api: Arc<dyn AuthApi>,
    pub(super) decoder: CredentialDecoder,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) settings: SessionSettings,
    pub(super) state: watch::Sender<SessionSnapshot>,
    pub(super) scheduler: Mutex<Option<ScheduledCheck>>,
    // Serializes credential transitions; never held across an await
    transition: Mutex<()>,
    next_check_id: AtomicU64,
}

impl SessionInner {
    fn current_credential(&self) -> Option<(String, u64)> {
        let state = self.state.borrow();
        state
            .credential
            .as_ref()
            .map(|c| (c.expose_secret().to_string(), state.generation))
    }

    fn apply(&self, raw: Option<&str>) -> SessionStatus {
        let _guard = self.transition.lock().unwrap_or_else(PoisonError::into_inner);
        self.apply_locked(raw)
    }

    fn apply_locked(&self, raw: Option<&str>) -> SessionStatus {
        let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
            self.clear_locked();
            return SessionStatus::Unauthenticated;
        };

        match self.decoder.decode(raw) {
            Ok(identity) => {
                if let Err(e) = self.storage.write(raw) {
                    error!("Failed to persist credential: {}", e);
                }
                info!(
                    "Session authenticated as {} ({}), expires at {}",
                    identity.user_name, identity.role, identity.expires_at
                );
                self.state.send_modify(|state| {
                    state.status = SessionStatus::Authenticated;
                    state.identity = Some(identity);
                    state.credential = Some(SecretString::from(raw.to_string()));
                    state.generation += 1;
                });
                SessionStatus::Authenticated
            }
            Err(e) => {
                warn!("Discarding credential that failed to decode: {}", e);
                self.clear_locked();
                SessionStatus::Unauthenticated
            }
        }
    }

    fn clear_locked(&self) {
        if let Err(e) = self.storage.remove() {
            error!("Failed to remove stored credential: {}", e);
        }
        self.state.send_modify(|state| {
            if state.credential.is_some() {
                debug!("Session credential cleared");
            }
            state.status = SessionStatus::Unauthenticated;
            state.identity = None;
            state.credential = None;
            state.generation += 1;
        });
    }

    /// Applies `next` only if the credential is still the one the exchange started from.
    fn settle_exchange(&self, generation: u64, next: Option<&str>) -> SessionStatus {
        let _guard = self.transition.lock().unwrap_or_else(PoisonError::into_inner);
        if self.state.borrow().generation != generation {
            debug!("Credential changed during exchange, discarding its result");
            return self.state.borrow().status;
        }
        self.apply_locked(next)
    }

    pub(super) async fn refresh(&self) -> SessionStatus {
        let Some((credential, generation)) = self.current_credential() else {
            debug!("Refresh skipped, no credential");
            return SessionStatus::Unauthenticated;
        };

        self.state.send_if_modified(|state| {
            if state.generation == generation {
                state.status = SessionStatus::Refreshing;
                true
            } else {
                false
            }
        });

        match self.api.refresh(&credential).await {
            Ok(renewed) => self.settle_exchange(generation, Some(&renewed)),
            Err(e) => {
                warn!("Credential refresh failed, ending session: {}", e);
                self.settle_exchange(generation, None)
            }
        }
    }

    async fn revalidate(&self) -> SessionStatus {
        let Some((credential, generation)) = self.current_credential() else {
            return SessionStatus::Unauthenticated;
        };

        match self.api.verify(&credential).await {
            Ok(confirmed) => self.settle_exchange(generation, Some(&confirmed)),
            Err(e) => {
                warn!("Server rejected the credential, ending session: {}", e);
                self.settle_exchange(generation, None)
            }
        }
    }
}

/// Owns the bearer credential, its identity projection and the refresh timer.
///
/// Decode and refresh failures never surface as errors: they end the session
/// and show up as a transition to `Unauthenticated`. Share it behind an `Arc`;
/// dropping the last handle cancels the refresh timer.
pub struct SessionManager {
    inner: Arc<SessionInner>,
}

pub struct SessionManagerBuilder {
    storage: Arc<dyn CredentialStorage>,
    api: Arc<dyn AuthApi>,
    decoder: CredentialDecoder,
    clock: Arc<dyn Clock>,
    settings: SessionSettings,
}

impl SessionManagerBuilder {
    pub fn decoder(mut self, decoder: CredentialDecoder) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn settings(mut self, settings: SessionSettings) -> Self {
        self.settings = SessionSettings::new(settings.check_interval, settings.refresh_margin_secs);
        self
    }

    pub fn build(self) -> SessionManager {
        let (state, _) = watch::channel(SessionSnapshot::unauthenticated());

        SessionManager {
            inner: Arc::new(SessionInner {
                storage: self.storage,
                api: self.api,
                decoder: self.decoder,
                clock: self.clock,
                settings: self.settings,
                state,
                scheduler: Mutex::new(None),
                transition: Mutex::new(()),
                next_check_id: AtomicU64::new(1),
            }),
        }
    }
}

impl SessionManager {
    pub fn builder(
        storage: Arc<dyn CredentialStorage>,
        api: Arc<dyn AuthApi>,
    ) -> SessionManagerBuilder {
        SessionManagerBuilder {
            storage,
            api,
            decoder: CredentialDecoder::unverified(),
            clock: Arc::new(SystemClock),
            settings: SessionSettings::default(),
        }
    }

    pub fn from_config(
        config: &Config,
        storage: Arc<dyn CredentialStorage>,
        api: Arc<dyn AuthApi>,
    ) -> Self {
        Self::builder(storage, api)
            .decoder(CredentialDecoder::from_config(config))
            .settings(config.session_settings())
            .build()
    }

    /// Loads the stored credential, as after a reload.
    pub fn restore(&self) -> SessionStatus {
        match self.inner.storage.read() {
            Ok(Some(raw)) => self.settle(self.inner.apply(Some(&raw))),
            Ok(None) => {
                debug!("No stored credential to restore");
                self.status()
            }
            Err(e) => {
                error!("Failed to read stored credential: {}", e);
                self.status()
            }
        }
    }

    /// Stores `raw` (or clears with `None`) and returns the resulting state.
    pub fn set_credential(&self, raw: Option<&str>) -> SessionStatus {
        self.settle(self.inner.apply(raw))
    }

    // A session that ended no longer owns a refresh timer
    fn settle(&self, status: SessionStatus) -> SessionStatus {
        if status == SessionStatus::Unauthenticated && self.inner.abort_check() {
            debug!("Refresh check released with the ended session");
        }
        status
    }

    pub fn current_identity(&self) -> Option<Identity> {
        self.inner.state.borrow().identity.clone()
    }

    pub fn credential(&self) -> Option<SecretString> {
        self.inner.state.borrow().credential.clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.inner.state.borrow().status
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.state.subscribe()
    }

    /// Explicit logout.
    pub fn invalidate(&self) {
        self.inner.abort_check();
        self.inner.apply(None);
        info!("Session invalidated");
    }

    pub async fn login(&self, username: &str, password: &SecretString) -> AppResult<SessionStatus> {
        let tokens = self.inner.api.login(username, password).await?;
        Ok(self.set_credential(Some(&tokens.access_token)))
    }

    /// Creates the account, then signs in with it.
    pub async fn register(&self, request: &RegisterRequest) -> AppResult<SessionStatus> {
        request.validate()?;
        self.inner.api.register(request).await?;

        let password = SecretString::from(request.password.clone());
        self.login(&request.username, &password).await
    }

    /// One refresh exchange right now. Failure ends the session.
    pub async fn refresh(&self) -> SessionStatus {
        self.settle(self.inner.refresh().await)
    }

    /// Has the server vouch for the credential, replacing the identity with
    /// the confirmed claims. Rejection ends the session.
    pub async fn revalidate(&self) -> SessionStatus {
        self.settle(self.inner.revalidate().await)
    }

    /// Starts the periodic expiry check, replacing any running one.
    ///
    /// The first check runs immediately. Must be called from within a Tokio runtime.
    pub fn schedule_refresh(&self) -> AppResult<()> {
        let runtime = Handle::try_current().map_err(|e| {
            AppError::InternalError(format!("Refresh scheduling needs a Tokio runtime: {}", e))
        })?;

        self.inner.abort_check();

        let id = self.inner.next_check_id.fetch_add(1, Ordering::Relaxed);
        let mut slot = self
            .inner
            .scheduler
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let handle = spawn_check_loop(&runtime, Arc::clone(&self.inner), id);
        if let Some(stale) = slot.replace(ScheduledCheck { id, handle }) {
            stale.handle.abort();
        }

        info!(
            "Scheduled credential check every {:?} with a {}s margin",
            self.inner.settings.check_interval, self.inner.settings.refresh_margin_secs
        );
        Ok(())
    }

    pub fn cancel_refresh(&self) -> bool {
        self.inner.abort_check()
    }

    pub fn is_refresh_scheduled(&self) -> bool {
        self.inner
            .scheduler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|check| !check.handle.is_finished())
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.inner.abort_check();
    }
}
