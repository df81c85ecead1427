//! Profile endpoints: `/me/`, profile edits, profile image, trends.

use reqwest::multipart::Form;
use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::http::ApiClient;

use super::{send_ack, Ack, UploadFile};

pub const PLACEHOLDER_NAME: &str = "Unknown User";

/// The logged-in user's profile as `/me/` reports it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub profile_image_url: Option<String>,
    #[serde(default)]
    pub profession: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub email_verified: Option<bool>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl Profile {
    /// Profile shown when `/me/` cannot be fetched.
    pub fn placeholder() -> Self {
        Self {
            full_name: Some(PLACEHOLDER_NAME.to_string()),
            ..Self::default()
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.id.is_none() && self.username.is_empty()
    }

    /// `full_name`, else first + last name, else username.
    pub fn display_name(&self) -> String {
        if let Some(full) = non_blank(&self.full_name) {
            return full.to_string();
        }
        let parts: Vec<&str> = [non_blank(&self.first_name), non_blank(&self.last_name)]
            .into_iter()
            .flatten()
            .collect();
        if !parts.is_empty() {
            return parts.join(" ");
        }
        if self.username.is_empty() {
            PLACEHOLDER_NAME.to_string()
        } else {
            self.username.clone()
        }
    }
}

pub async fn me(client: &ApiClient) -> Result<Profile> {
    let request = client.request(Method::GET, "/me/")?;
    client.send_json(request).await
}

/// Like [`me`], but degrade to [`Profile::placeholder`] on failure.
///
/// A 401 still reaches the client's interception stage before it is
/// swallowed here.
pub async fn me_or_placeholder(client: &ApiClient) -> Profile {
    match me(client).await {
        Ok(profile) => profile,
        Err(err) => {
            tracing::warn!(%err, "profile fetch failed, showing placeholder");
            Profile::placeholder()
        }
    }
}

/// Fields for `PATCH /profile/update/`. Only `Some` fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub profession: Option<String>,
    pub bio: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.fields().next().is_none()
    }

    fn fields(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("email", &self.email),
            ("profession", &self.profession),
            ("bio", &self.bio),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.as_deref().map(|v| (name, v)))
    }

    fn to_form(&self) -> Form {
        self.fields()
            .fold(Form::new(), |form, (name, value)| form.text(name, value.to_string()))
    }
}

pub async fn update_profile(client: &ApiClient, update: &ProfileUpdate) -> Result<Ack> {
    let request = client
        .request(Method::PATCH, "/profile/update/")?
        .multipart(update.to_form());
    send_ack(client, request).await
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageUploaded {
    #[serde(default)]
    pub ok: bool,
    pub profile_image_url: String,
}

pub async fn upload_profile_image(client: &ApiClient, image: UploadFile) -> Result<ImageUploaded> {
    let form = Form::new().part("image", image.into_part()?);
    let request = client
        .request(Method::POST, "/upload-profile-image/")?
        .multipart(form);
    client.send_json(request).await
}

pub async fn clear_profile_image(client: &ApiClient) -> Result<Ack> {
    let request = client.request(Method::POST, "/profile/clear-image/")?;
    send_ack(client, request).await
}

/// One "trends for you" card.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trend {
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl Trend {
    /// `tag`, else `#<type>`, else `#topic`.
    pub fn display_tag(&self) -> String {
        if let Some(tag) = non_blank(&self.tag) {
            return tag.to_string();
        }
        format!("#{}", non_blank(&self.kind).unwrap_or("topic"))
    }
}

#[derive(Debug, Deserialize)]
struct TrendsResponse {
    #[serde(default)]
    trends: Vec<Trend>,
}

pub async fn trends(client: &ApiClient) -> Result<Vec<Trend>> {
    let request = client.request(Method::GET, "/profile/trends/")?;
    let body: TrendsResponse = client.send_json(request).await?;
    Ok(body.trends)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_fallbacks() {
        let mut profile = Profile {
            username: "ada".into(),
            ..Profile::default()
        };
        assert_eq!(profile.display_name(), "ada");

        profile.last_name = Some("Lovelace".into());
        assert_eq!(profile.display_name(), "Lovelace");

        profile.first_name = Some("Ada".into());
        assert_eq!(profile.display_name(), "Ada Lovelace");

        profile.full_name = Some("Countess of Lovelace".into());
        assert_eq!(profile.display_name(), "Countess of Lovelace");
    }

    #[test]
    fn placeholder_is_unknown_user() {
        let profile = Profile::placeholder();
        assert!(profile.is_placeholder());
        assert_eq!(profile.display_name(), "Unknown User");
    }

    #[test]
    fn profile_tolerates_nulls() {
        let profile: Profile = serde_json::from_str(
            r#"{"id": 3, "username": "ada", "full_name": "", "first_name": null, "bio": null}"#,
        )
        .unwrap();
        assert_eq!(profile.id, Some(3));
        assert_eq!(profile.display_name(), "ada");
    }

    #[test]
    fn profile_update_sends_only_set_fields() {
        let update = ProfileUpdate::default();
        assert!(update.is_empty());

        let update = ProfileUpdate {
            bio: Some("Rustacean".into()),
            profession: Some("Engineer".into()),
            ..ProfileUpdate::default()
        };
        let names: Vec<&str> = update.fields().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["profession", "bio"]);
    }

    #[test]
    fn trend_tag_fallbacks() {
        let trend: Trend = serde_json::from_str(r#"{"type": "course", "title": "Rust"}"#).unwrap();
        assert_eq!(trend.display_tag(), "#course");

        let trend: Trend = serde_json::from_str(r##"{"tag": "#async", "title": "Tokio"}"##).unwrap();
        assert_eq!(trend.display_tag(), "#async");

        assert_eq!(Trend::default().display_tag(), "#topic");
    }
}
