use chrono::Local;
use clap::Subcommand;
use resumatch_core::api::account;

use crate::context::{print_json, Context};

#[derive(Subcommand)]
pub enum AccountAction {
    /// Change username and email
    Update {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
    },
    /// Email a verification code
    SendCode,
    /// Confirm your email with the emailed code
    Verify {
        code: String,
    },
    /// Change your password
    ChangePassword {
        #[arg(long)]
        current: String,
        #[arg(long)]
        new: String,
        #[arg(long)]
        confirm: String,
    },
    /// Permanently delete your account
    Delete {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
    /// Recent logins to your account
    Activity {
        #[arg(long)]
        json: bool,
    },
    /// Sign out another session
    LogoutSession {
        session_id: String,
    },
}

pub async fn run(ctx: &Context, action: AccountAction) -> Result<(), Box<dyn std::error::Error>> {
    ctx.require_session()?;
    let app = &ctx.app;
    match action {
        AccountAction::Update { username, email } => {
            let updated = account::update_account(&app.client, &username, &email).await?;
            println!("account updated");
            if updated.email_changed && updated.email_verified != Some(true) {
                println!("email changed; run `resumatch account send-code` to verify it");
            }
        }
        AccountAction::SendCode => {
            let ack = account::send_verification(&app.client).await?;
            println!("{}", ack.message.as_deref().unwrap_or("verification code sent"));
        }
        AccountAction::Verify { code } => {
            let result = account::verify_email(&app.client, &code).await?;
            if result.email_verified {
                println!("email verified");
            } else {
                return Err("verification failed; request a new code".into());
            }
        }
        AccountAction::ChangePassword {
            current,
            new,
            confirm,
        } => {
            account::change_password(&app.client, &current, &new, &confirm).await?;
            println!("password changed");
        }
        AccountAction::Delete { yes } => {
            if !yes {
                return Err("refusing to delete the account without --yes".into());
            }
            account::delete_account(&app.client, &app.sessions).await?;
            app.router.reset();
            println!("account deleted");
        }
        AccountAction::Activity { json } => {
            let events = account::login_activity(&app.client).await?;
            if json {
                return print_json(&events);
            }
            for event in events {
                let when = event
                    .timestamp
                    .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "unknown time".to_string());
                let device = event.device.as_deref().unwrap_or_default();
                let marker = if event.current_session { " (this session)" } else { "" };
                println!(
                    "{when}  {} on {}  {}  {}{marker}",
                    account::browser_name(device),
                    account::os_name(device),
                    event.ip.as_deref().unwrap_or("-"),
                    event.location.as_deref().unwrap_or("-"),
                );
                if let Some(id) = event.session_id.as_deref().filter(|_| !event.current_session) {
                    println!("    id: {id}");
                }
            }
        }
        AccountAction::LogoutSession { session_id } => {
            account::logout_session(&app.client, &session_id).await?;
            println!("session {session_id} signed out");
        }
    }
    Ok(())
}
