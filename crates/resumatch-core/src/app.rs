//! Wires the credential scopes, session manager, HTTP client and router
//! into one application handle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::http::ApiClient;
use crate::router::{Route, Router};
use crate::session::{Session, SessionManager};
use crate::storage::{self, Config, DurableBackend, FileStore, KeyValueStore, KeyringStore};

pub const DURABLE_FILE: &str = "credentials.json";
pub const TAB_FILE: &str = "session.json";

/// Everything a front end needs to talk to the backend.
///
/// The client's default header follows the session, and a 401 from any
/// endpoint logs out and sends the router back to [`Route::Login`].
#[derive(Debug, Clone)]
pub struct App {
    pub config: Config,
    pub sessions: Arc<SessionManager>,
    pub client: ApiClient,
    pub router: Router,
    expired: Arc<AtomicBool>,
}

impl App {
    /// Build from `config` with the scopes it selects: the durable scope in
    /// the data dir or the OS keyring, the tab scope in the session dir.
    pub fn from_config(config: Config) -> Result<Self> {
        let durable: Arc<dyn KeyValueStore> = match config.storage.durable_backend {
            DurableBackend::File => Arc::new(FileStore::new(storage::data_dir()?.join(DURABLE_FILE))),
            DurableBackend::Keyring => Arc::new(KeyringStore::default()),
        };
        let tab: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(storage::session_dir()?.join(TAB_FILE)));
        Self::with_scopes(config, durable, tab)
    }

    pub fn with_scopes(
        config: Config,
        durable: Arc<dyn KeyValueStore>,
        tab: Arc<dyn KeyValueStore>,
    ) -> Result<Self> {
        let sessions = Arc::new(SessionManager::new(durable, tab));
        let router = Router::new();
        let expired = Arc::new(AtomicBool::new(false));

        let hook_sessions = Arc::clone(&sessions);
        let hook_router = router.clone();
        let hook_expired = Arc::clone(&expired);
        let client = ApiClient::builder(config.api_base_url())
            .timeout(Duration::from_secs(config.api.timeout_secs))
            .on_unauthorized(move || {
                if hook_sessions.is_authenticated() {
                    hook_expired.store(true, Ordering::SeqCst);
                }
                if let Err(err) = hook_sessions.logout() {
                    tracing::warn!(%err, "failed to clear credentials after 401");
                }
                hook_router.reset();
            })
            .build()?;
        client.bind_session(&sessions);

        Ok(Self {
            config,
            sessions,
            client,
            router,
            expired,
        })
    }

    /// Pick up a persisted credential and land on the matching entry point.
    pub fn restore(&self) -> Result<Option<Session>> {
        let session = self.sessions.restore()?;
        self.router.resolve(Route::entry(self.sessions.state()), self.sessions.state());
        Ok(session)
    }

    /// Whether a 401 has ended an authenticated session since startup.
    pub fn session_expired(&self) -> bool {
        self.expired.load(Ordering::SeqCst)
    }

    /// Log out locally and return to the login view.
    pub fn logout(&self) -> Result<()> {
        self.sessions.logout()?;
        self.router.reset();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::token::encode_unsigned;
    use crate::session::SessionState;
    use crate::storage::MemoryStore;

    fn app() -> (App, Arc<MemoryStore>, Arc<MemoryStore>) {
        let durable = Arc::new(MemoryStore::new());
        let tab = Arc::new(MemoryStore::new());
        let app = App::with_scopes(Config::default(), durable.clone(), tab.clone()).unwrap();
        (app, durable, tab)
    }

    #[test]
    fn header_follows_session() {
        let (app, _, _) = app();
        assert!(!app.client.auth_header().is_set());

        let token = encode_unsigned(&serde_json::json!({ "sub": "ada" }));
        app.sessions
            .commit_credentials(&token, "ada@example.com", "ada", true)
            .unwrap();
        assert!(app.client.auth_header().is_set());

        app.logout().unwrap();
        assert!(!app.client.auth_header().is_set());
        assert_eq!(app.router.current(), Route::Login);
    }

    #[test]
    fn restore_lands_on_entry_point() {
        let (app, durable, _) = app();
        let token = encode_unsigned(&serde_json::json!({ "sub": "ada" }));
        durable.set("token", &token).unwrap();
        durable.set("email", "ada@example.com").unwrap();
        durable.set("username", "ada").unwrap();

        let session = app.restore().unwrap();
        assert_eq!(session.map(|s| s.username), Some("ada".to_string()));
        assert_eq!(app.sessions.state(), SessionState::Authenticated);
        assert_eq!(app.router.current(), Route::Matcher);
        assert!(app.client.auth_header().is_set());
        assert!(!app.session_expired());
    }
}
