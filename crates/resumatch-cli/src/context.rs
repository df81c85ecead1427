use std::error::Error;

use resumatch_core::{App, AuthError, Config, CoreError, Session};

/// State shared by the commands that talk to the backend.
pub struct Context {
    pub app: App,
}

impl Context {
    /// Load the config, wire the app and pick up any persisted session.
    pub fn load() -> Result<Self, CoreError> {
        let config = Config::load()?;
        let app = App::from_config(config)?;
        app.restore()?;
        tracing::debug!(
            base_url = %app.client.base_url(),
            state = ?app.sessions.state(),
            route = %app.router.current(),
            "context ready"
        );
        Ok(Self { app })
    }

    pub fn require_session(&self) -> Result<Session, CoreError> {
        self.app
            .sessions
            .current()
            .ok_or_else(|| AuthError::NotAuthenticated.into())
    }

    /// A 401 ends the command as a failure even when the command itself
    /// recovered from it. Other command errors are reported as they are.
    pub fn finish(&self, result: Result<(), Box<dyn Error>>) -> Result<(), Box<dyn Error>> {
        match result {
            Ok(()) if self.app.session_expired() => {
                Err(CoreError::from(AuthError::Unauthorized).into())
            }
            other => other,
        }
    }
}

/// Read one line from stdin, without the trailing newline.
pub fn read_line(prompt: &str) -> std::io::Result<String> {
    use std::io::Write;

    eprint!("{prompt}");
    std::io::stderr().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

pub fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
