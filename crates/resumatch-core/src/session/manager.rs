//! The session store.
//!
//! [`SessionManager`] is the single owner of "who is logged in". It persists
//! the credential into one of two [`KeyValueStore`] scopes and notifies
//! subscribers synchronously on every change, which is how the HTTP client
//! keeps its default `Authorization` header in step.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::token::check_token;
use crate::api::auth::{self, LoginForm};
use crate::error::{AuthError, Result, StorageError};
use crate::http::ApiClient;
use crate::storage::KeyValueStore;

pub const TOKEN_KEY: &str = "token";
pub const EMAIL_KEY: &str = "email";
pub const USERNAME_KEY: &str = "username";

const CREDENTIAL_KEYS: [&str; 3] = [TOKEN_KEY, EMAIL_KEY, USERNAME_KEY];

/// An authenticated identity. Never constructed around an expired token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub email: String,
    pub username: String,
    /// From the token's `exp` claim; `None` for non-expiring tokens.
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Build a session, rejecting undecodable or already expired tokens.
    pub fn new(
        token: impl Into<String>,
        email: impl Into<String>,
        username: impl Into<String>,
    ) -> Result<Self, AuthError> {
        Self::new_at(token, email, username, Utc::now())
    }

    pub fn new_at(
        token: impl Into<String>,
        email: impl Into<String>,
        username: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, AuthError> {
        let token = token.into();
        let claims = check_token(&token, now)?;
        Ok(Self {
            token,
            email: email.into(),
            username: username.into(),
            expires_at: claims.expires_at(),
        })
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp < now)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Anonymous,
    Authenticated,
}

/// Which persistence scope holds the live credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Survives restarts; chosen by "remember me".
    Durable,
    /// Dropped with the runtime dir (or the process, for in-memory scopes).
    Tab,
}

impl Scope {
    pub fn for_remember(remember: bool) -> Self {
        if remember {
            Scope::Durable
        } else {
            Scope::Tab
        }
    }
}

/// Handle returned by [`SessionManager::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerId(u64);

type Listener = Arc<dyn Fn(Option<&Session>) + Send + Sync>;

#[derive(Default)]
struct Inner {
    live: Option<(Session, Scope)>,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener: u64,
}

pub struct SessionManager {
    durable: Arc<dyn KeyValueStore>,
    tab: Arc<dyn KeyValueStore>,
    inner: Mutex<Inner>,
}

impl SessionManager {
    /// Create an anonymous manager over the two scopes. Call
    /// [`restore`](Self::restore) to pick up a persisted credential.
    pub fn new(durable: Arc<dyn KeyValueStore>, tab: Arc<dyn KeyValueStore>) -> Self {
        Self {
            durable,
            tab,
            inner: Mutex::new(Inner::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn store(&self, scope: Scope) -> &dyn KeyValueStore {
        match scope {
            Scope::Durable => self.durable.as_ref(),
            Scope::Tab => self.tab.as_ref(),
        }
    }

    pub fn current(&self) -> Option<Session> {
        self.lock().live.as_ref().map(|(s, _)| s.clone())
    }

    pub fn current_scope(&self) -> Option<Scope> {
        self.lock().live.as_ref().map(|(_, scope)| *scope)
    }

    pub fn state(&self) -> SessionState {
        if self.lock().live.is_some() {
            SessionState::Authenticated
        } else {
            SessionState::Anonymous
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.state() == SessionState::Authenticated
    }

    /// Register `listener` for session changes. It is called once right away
    /// with the current session, then after every change.
    ///
    /// Listeners run while the store is locked, so nobody can read the new
    /// session before every listener has seen it. A listener must not call
    /// back into the manager.
    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(Option<&Session>) + Send + Sync + 'static,
    {
        let mut inner = self.lock();
        let id = ListenerId(inner.next_listener);
        inner.next_listener += 1;

        let listener: Listener = Arc::new(listener);
        listener(inner.live.as_ref().map(|(s, _)| s));
        inner.listeners.push((id, listener));
        id
    }

    pub fn unsubscribe(&self, id: ListenerId) {
        self.lock().listeners.retain(|(lid, _)| *lid != id);
    }

    fn replace(&self, inner: &mut Inner, live: Option<(Session, Scope)>) {
        inner.live = live;
        let session = inner.live.as_ref().map(|(s, _)| s);
        for (_, listener) in &inner.listeners {
            listener(session);
        }
    }

    fn read_scope(&self, scope: Scope) -> Result<[Option<String>; 3], StorageError> {
        let store = self.store(scope);
        Ok([
            store.get(TOKEN_KEY)?,
            store.get(EMAIL_KEY)?,
            store.get(USERNAME_KEY)?,
        ])
    }

    /// An unreadable scope counts as empty and is purged.
    fn read_scope_or_purge(&self, scope: Scope) -> [Option<String>; 3] {
        match self.read_scope(scope) {
            Ok(values) => values,
            Err(err) => {
                tracing::warn!(%err, ?scope, "discarding unreadable credential scope");
                if let Err(err) = self.clear_scope(scope) {
                    tracing::warn!(%err, ?scope, "failed to purge credential scope");
                }
                [None, None, None]
            }
        }
    }

    fn clear_scope(&self, scope: Scope) -> Result<(), StorageError> {
        let store = self.store(scope);
        for key in CREDENTIAL_KEYS {
            store.remove(key)?;
        }
        Ok(())
    }

    fn clear_all_scopes(&self) -> Result<(), StorageError> {
        // Attempt both scopes even when the first one fails.
        let durable = self.clear_scope(Scope::Durable);
        let tab = self.clear_scope(Scope::Tab);
        durable.and(tab)
    }

    /// Load the persisted credential and make it the live session.
    ///
    /// The tab scope wins when it holds all three keys; otherwise the durable
    /// scope is used. An undecodable or expired token purges both scopes; a
    /// scope that cannot be read is treated as empty and purged.
    pub fn restore(&self) -> Result<Option<Session>> {
        self.restore_at(Utc::now())
    }

    pub fn restore_at(&self, now: DateTime<Utc>) -> Result<Option<Session>> {
        let tab = self.read_scope_or_purge(Scope::Tab);
        let (values, scope) = if tab.iter().all(Option::is_some) {
            (tab, Scope::Tab)
        } else {
            (self.read_scope_or_purge(Scope::Durable), Scope::Durable)
        };
        let [token, email, username] = values;

        let mut inner = self.lock();
        let Some(token) = token else {
            self.replace(&mut inner, None);
            return Ok(None);
        };

        if let Err(err) = check_token(&token, now) {
            tracing::warn!(%err, "discarding persisted credential");
            self.replace(&mut inner, None);
            drop(inner);
            self.clear_all_scopes()?;
            return Ok(None);
        }

        let (Some(email), Some(username)) = (email, username) else {
            self.replace(&mut inner, None);
            return Ok(None);
        };

        let session = Session::new_at(token, email, username, now)?;
        tracing::debug!(username = %session.username, ?scope, "restored session");
        self.replace(&mut inner, Some((session.clone(), scope)));
        Ok(Some(session))
    }

    /// Persist `session` and make it live.
    ///
    /// `remember` selects the durable scope; otherwise the tab scope is used.
    /// The other scope is cleared. A session whose token has expired since it
    /// was built logs everything out instead and fails with
    /// [`AuthError::TokenExpired`].
    pub fn commit(&self, session: Session, remember: bool) -> Result<Session> {
        self.commit_at(session, remember, Utc::now())
    }

    pub fn commit_at(&self, session: Session, remember: bool, now: DateTime<Utc>) -> Result<Session> {
        if let Err(err) = check_token(&session.token, now) {
            tracing::warn!(%err, "refusing to store credential");
            self.logout()?;
            return Err(err.into());
        }

        let scope = Scope::for_remember(remember);
        let other = match scope {
            Scope::Durable => Scope::Tab,
            Scope::Tab => Scope::Durable,
        };

        let store = self.store(scope);
        store.set(TOKEN_KEY, &session.token)?;
        store.set(EMAIL_KEY, &session.email)?;
        store.set(USERNAME_KEY, &session.username)?;
        self.clear_scope(other)?;

        tracing::info!(username = %session.username, ?scope, "session committed");
        let mut inner = self.lock();
        self.replace(&mut inner, Some((session.clone(), scope)));
        Ok(session)
    }

    /// Build a session from raw credentials and commit it. An expired token
    /// clears all state, as [`commit`](Self::commit) does.
    pub fn commit_credentials(
        &self,
        token: &str,
        email: &str,
        username: &str,
        remember: bool,
    ) -> Result<Session> {
        match Session::new(token, email, username) {
            Ok(session) => self.commit(session, remember),
            Err(err) => {
                tracing::warn!(%err, "refusing to store credential");
                self.logout()?;
                Err(err.into())
            }
        }
    }

    /// Clear both scopes and the live session. Idempotent.
    ///
    /// The live session is dropped even if a scope cannot be cleared; the
    /// storage error is still reported.
    pub fn logout(&self) -> Result<(), StorageError> {
        {
            let mut inner = self.lock();
            if let Some((session, _)) = &inner.live {
                tracing::info!(username = %session.username, "logging out");
            }
            self.replace(&mut inner, None);
        }
        self.clear_all_scopes()
    }

    /// Exchange credentials for a token at `/login/` and commit the result.
    ///
    /// # Errors
    ///
    /// [`AuthError::InvalidCredentials`] when the backend rejects the
    /// credentials, a transport error when the backend is unreachable.
    pub async fn login(
        &self,
        client: &ApiClient,
        identifier: &str,
        password: &str,
        remember: bool,
    ) -> Result<Session> {
        let form = LoginForm::new(identifier, password, remember);
        let response = auth::request_token(client, &form).await?;
        self.commit_credentials(
            &response.access_token,
            &response.email,
            &response.username,
            remember,
        )
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("SessionManager")
            .field("username", &inner.live.as_ref().map(|(s, _)| &s.username))
            .field("listeners", &inner.listeners.len())
            .finish()
    }
}
