//! Unauthenticated endpoints: login, registration, password reset.

use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};

use crate::error::{AuthError, Result, ValidationError};
use crate::http::client::{decode_json, detail_message, error_for_response};
use crate::http::ApiClient;
use crate::session::{Session, SessionManager};

use super::{require, send_ack, Ack};

/// Form body of `POST /login/` (OAuth2 password grant).
#[derive(Debug, Clone, Serialize)]
pub struct LoginForm {
    /// Username or email.
    pub username: String,
    pub password: String,
    pub grant_type: &'static str,
    pub remember: &'static str,
}

impl LoginForm {
    pub fn new(identifier: &str, password: &str, remember: bool) -> Self {
        Self {
            username: identifier.to_string(),
            password: password.to_string(),
            grant_type: "password",
            remember: if remember { "true" } else { "false" },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub user_id: Option<i64>,
    pub email: String,
    pub username: String,
}

/// Exchange credentials for a bearer token. Does not touch the session;
/// see [`SessionManager::login`].
pub async fn request_token(client: &ApiClient, form: &LoginForm) -> Result<LoginResponse> {
    require("username", &form.username)?;
    require("password", &form.password)?;

    let request = client.request(Method::POST, "/login/")?.form(form);
    let response = client.execute(request).await?;

    match response.status() {
        s if s.is_success() => decode_json(response).await,
        StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            let body = response.text().await.unwrap_or_default();
            let detail = detail_message(&body)
                .unwrap_or_else(|| "Incorrect username/email or password".to_string());
            Err(AuthError::InvalidCredentials(detail).into())
        }
        _ => Err(error_for_response(response).await),
    }
}

/// Form body of `POST /register/`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

impl RegisterForm {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("username", &self.username)?;
        require("email", &self.email)?;
        require("password", &self.password)?;
        require("first_name", &self.first_name)?;
        require("last_name", &self.last_name)?;
        if !self.email.contains('@') {
            return Err(ValidationError::InvalidValue {
                field: "email".to_string(),
                message: format!("'{}' is not an email address", self.email),
            });
        }
        Ok(())
    }
}

/// The account record `POST /register/` returns.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisteredUser {
    #[serde(default)]
    pub id: Option<i64>,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

pub async fn register(client: &ApiClient, form: &RegisterForm) -> Result<RegisteredUser> {
    form.validate()?;
    let request = client.request(Method::POST, "/register/")?.form(form);
    client.send_json(request).await
}

/// Register, then log in with the same credentials.
///
/// The new session goes to the tab scope, as after a login without
/// "remember me".
pub async fn signup(
    client: &ApiClient,
    sessions: &SessionManager,
    form: &RegisterForm,
) -> Result<Session> {
    let user = register(client, form).await?;
    tracing::info!(username = %user.username, "account registered");
    sessions.login(client, &form.username, &form.password, false).await
}

pub async fn request_password_reset(client: &ApiClient, email: &str) -> Result<Ack> {
    require("email", email)?;
    let request = client
        .request(Method::POST, "/request-password-reset/")?
        .form(&[("email", email.trim())]);
    send_ack(client, request).await
}

/// Identity bound to a password reset token.
#[derive(Debug, Clone, Deserialize)]
pub struct ResetTokenInfo {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub user_id: Option<i64>,
    pub username: String,
    pub email: String,
}

pub async fn verify_password_reset(client: &ApiClient, token: &str) -> Result<ResetTokenInfo> {
    require("token", token)?;
    let request = client
        .request(Method::POST, "/verify-password-reset/")?
        .form(&[("token", token.trim())]);
    client.send_json(request).await
}

pub async fn reset_password(client: &ApiClient, token: &str, new_password: &str) -> Result<Ack> {
    require("token", token)?;
    require("new_password", new_password)?;
    let request = client
        .request(Method::POST, "/reset-password/")?
        .form(&[("token", token.trim()), ("new_password", new_password)]);
    send_ack(client, request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_form_encodes_remember_flag() {
        let form = LoginForm::new("ada@example.com", "pw", true);
        assert_eq!(form.grant_type, "password");
        assert_eq!(form.remember, "true");
        assert_eq!(LoginForm::new("ada", "pw", false).remember, "false");
    }

    #[test]
    fn register_form_requires_every_field() {
        let mut form = RegisterForm {
            username: "ada".into(),
            email: "ada@example.com".into(),
            password: "pw".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
        };
        assert!(form.validate().is_ok());

        form.last_name = "  ".into();
        assert_eq!(
            form.validate(),
            Err(ValidationError::MissingField("last_name".into()))
        );
    }

    #[test]
    fn register_form_checks_email_shape() {
        let form = RegisterForm {
            username: "ada".into(),
            email: "ada.example.com".into(),
            password: "pw".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
        };
        assert!(matches!(
            form.validate(),
            Err(ValidationError::InvalidValue { .. })
        ));
    }
}
