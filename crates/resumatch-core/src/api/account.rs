//! Account and security endpoints.

use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::multipart::Form;
use reqwest::Method;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;

use crate::error::{Result, ValidationError};
use crate::http::ApiClient;
use crate::session::SessionManager;

use super::{require, send_ack, Ack};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AccountUpdated {
    #[serde(default)]
    pub email_changed: bool,
    #[serde(default)]
    pub email_verified: Option<bool>,
}

pub async fn update_account(client: &ApiClient, username: &str, email: &str) -> Result<AccountUpdated> {
    require("username", username)?;
    require("email", email)?;
    let form = Form::new()
        .text("username", username.trim().to_string())
        .text("email", email.trim().to_string());
    let request = client.request(Method::PATCH, "/account/update/")?.multipart(form);
    client.send_json(request).await
}

pub async fn send_verification(client: &ApiClient) -> Result<Ack> {
    let request = client.request(Method::POST, "/account/send-verification/")?;
    send_ack(client, request).await
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EmailVerification {
    #[serde(default)]
    pub email_verified: bool,
}

pub async fn verify_email(client: &ApiClient, code: &str) -> Result<EmailVerification> {
    let code = code.trim();
    require("code", code)?;
    let request = client
        .request(Method::POST, "/account/verify-email/")?
        .form(&[("code", code)]);
    client.send_json(request).await
}

/// Check a password change locally before anything is sent.
pub fn validate_password_change(current: &str, new: &str, confirm: &str) -> Result<(), ValidationError> {
    require("current_password", current)?;
    require("new_password", new)?;
    require("confirm_password", confirm)?;
    if new != confirm {
        return Err(ValidationError::Mismatch {
            field: "confirm_password".to_string(),
            message: "New password and confirmation do not match".to_string(),
        });
    }
    Ok(())
}

pub async fn change_password(client: &ApiClient, current: &str, new: &str, confirm: &str) -> Result<Ack> {
    validate_password_change(current, new, confirm)?;
    let form = Form::new()
        .text("current_password", current.to_string())
        .text("new_password", new.to_string());
    let request = client
        .request(Method::POST, "/account/change-password/")?
        .multipart(form);
    send_ack(client, request).await
}

/// Delete the account and, on success, log out locally.
pub async fn delete_account(client: &ApiClient, sessions: &SessionManager) -> Result<()> {
    let request = client.request(Method::DELETE, "/account/delete/")?;
    client.send(request).await?;
    tracing::info!("account deleted");
    sessions.logout()?;
    Ok(())
}

/// One entry of the login history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginEvent {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ip: Option<String>,
    /// Raw user agent string.
    #[serde(default)]
    pub device: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub current_session: bool,
}

/// Accept RFC 3339 and naive ISO timestamps (taken as UTC); anything else
/// becomes `None` rather than failing the whole list.
fn lenient_timestamp<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(&s, "%Y-%m-%dT%H:%M:%S%.f")
                    .ok()
                    .map(|naive| naive.and_utc())
            })
    }))
}

/// Best-effort browser name from a user agent.
pub fn browser_name(user_agent: &str) -> &'static str {
    let ua = user_agent.to_ascii_lowercase();
    if ua.contains("edg/") {
        "Edge"
    } else if ua.contains("opr/") || ua.contains("opera") {
        "Opera"
    } else if ua.contains("firefox/") {
        "Firefox"
    } else if ua.contains("chrome/") {
        "Chrome"
    } else if ua.contains("safari/") {
        "Safari"
    } else {
        "Unknown"
    }
}

/// Best-effort operating system name from a user agent.
pub fn os_name(user_agent: &str) -> &'static str {
    let ua = user_agent.to_ascii_lowercase();
    if ua.contains("windows") {
        "Windows"
    } else if ua.contains("android") {
        "Android"
    } else if ua.contains("iphone") || ua.contains("ipad") {
        "iOS"
    } else if ua.contains("mac os") || ua.contains("macintosh") {
        "macOS"
    } else if ua.contains("linux") {
        "Linux"
    } else {
        "Unknown"
    }
}

#[derive(Debug, Deserialize)]
struct LoginActivity {
    #[serde(default)]
    events: Vec<LoginEvent>,
}

pub async fn login_activity(client: &ApiClient) -> Result<Vec<LoginEvent>> {
    let request = client.request(Method::GET, "/account/login-activity/")?;
    let body: LoginActivity = client.send_json(request).await?;
    Ok(body.events)
}

pub async fn logout_session(client: &ApiClient, session_id: &str) -> Result<Ack> {
    require("session_id", session_id)?;
    let request = client
        .request(Method::POST, "/account/logout-session/")?
        .json(&json!({ "session_id": session_id }));
    send_ack(client, request).await
}
