use clap::Subcommand;
use resumatch_core::api::{auth, profile};
use serde_json::json;

use crate::context::{print_json, read_line, Context};

#[derive(Subcommand)]
pub enum AuthAction {
    /// Log in with a username or email
    Login {
        /// Username or email
        identifier: String,
        /// Password (read from stdin when omitted)
        #[arg(long)]
        password: Option<String>,
        /// Keep the session across reboots
        #[arg(long)]
        remember: bool,
    },
    /// Create an account and log in
    Signup {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
    },
    /// Forget the stored session
    Logout,
    /// Show whether a session is stored
    Status {
        #[arg(long)]
        json: bool,
    },
    /// Show the logged-in user's name and email
    Whoami {
        #[arg(long)]
        json: bool,
    },
    /// Email a password reset link
    RequestReset {
        email: String,
    },
    /// Set a new password with a reset token
    ResetPassword {
        #[arg(long)]
        token: String,
        #[arg(long)]
        new_password: String,
    },
}

pub async fn run(ctx: &Context, action: AuthAction) -> Result<(), Box<dyn std::error::Error>> {
    let app = &ctx.app;
    match action {
        AuthAction::Login {
            identifier,
            password,
            remember,
        } => {
            let password = match password {
                Some(p) => p,
                None => read_line("password: ")?,
            };
            let session = app
                .sessions
                .login(&app.client, &identifier, &password, remember)
                .await?;
            println!("logged in as {}", session.username);
        }
        AuthAction::Signup {
            username,
            email,
            password,
            first_name,
            last_name,
        } => {
            let form = auth::RegisterForm {
                username,
                email,
                password,
                first_name,
                last_name,
            };
            let session = auth::signup(&app.client, &app.sessions, &form).await?;
            println!("account created, logged in as {}", session.username);
        }
        AuthAction::Logout => {
            app.logout()?;
            println!("logged out");
        }
        AuthAction::Status { json } => {
            let session = app.sessions.current();
            let scope = app.sessions.current_scope();
            if json {
                let status = json!({
                    "state": app.sessions.state(),
                    "username": session.as_ref().map(|s| &s.username),
                    "email": session.as_ref().map(|s| &s.email),
                    "scope": scope,
                    "expires_at": session.as_ref().and_then(|s| s.expires_at),
                });
                return print_json(&status);
            }
            match session {
                Some(session) => {
                    let scope = match scope {
                        Some(resumatch_core::Scope::Durable) => "remembered",
                        _ => "this login only",
                    };
                    println!("authenticated as {} <{}> ({scope})", session.username, session.email);
                    match session.expires_at {
                        Some(exp) => println!("expires {}", exp.format("%Y-%m-%d %H:%M:%S UTC")),
                        None => println!("no expiry"),
                    }
                }
                None => println!("not authenticated"),
            }
        }
        AuthAction::Whoami { json } => {
            let session = ctx.require_session()?;
            let profile = profile::me_or_placeholder(&app.client).await;
            if json {
                return print_json(&profile);
            }
            println!("{}", profile.display_name());
            println!("username: {}", session.username);
            println!("email:    {}", profile.email.as_deref().unwrap_or(&session.email));
        }
        AuthAction::RequestReset { email } => {
            let ack = auth::request_password_reset(&app.client, &email).await?;
            println!(
                "{}",
                ack.message
                    .unwrap_or_else(|| format!("if {email} has an account, a reset link is on its way"))
            );
        }
        AuthAction::ResetPassword {
            token,
            new_password,
        } => {
            let identity = auth::verify_password_reset(&app.client, &token).await?;
            auth::reset_password(&app.client, &token, &new_password).await?;
            println!("password reset for {}", identity.username);
        }
    }
    Ok(())
}
