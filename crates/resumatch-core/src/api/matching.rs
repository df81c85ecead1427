//! `POST /upload-resume/`.

use std::collections::BTreeMap;

use reqwest::multipart::Form;
use reqwest::Method;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::Result;
use crate::http::ApiClient;

use super::UploadFile;

/// A follow-up question the backend suggests, with its answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiSuggestion {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub answer: String,
}

/// Full analysis of a resume against a job description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchReport {
    /// Backend text-overlap scores, in `0.0..=1.0`. Informational only.
    #[serde(default)]
    pub scores: Vec<f64>,
    #[serde(default)]
    pub met_requirements: Vec<String>,
    #[serde(default)]
    pub missing_requirements: Vec<String>,
    #[serde(default)]
    pub requirement_explanations: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "suggestion_list")]
    pub ai_suggestions: Vec<AiSuggestion>,
}

impl MatchReport {
    pub fn explanation(&self, requirement: &str) -> Option<&str> {
        self.requirement_explanations
            .get(requirement)
            .map(String::as_str)
            .filter(|e| !e.is_empty())
    }

    /// The backend reports analysis failures as a 200 with no requirements
    /// and a single `"Error"` suggestion carrying the message.
    pub fn backend_error(&self) -> Option<&str> {
        if !self.met_requirements.is_empty() || !self.missing_requirements.is_empty() {
            return None;
        }
        match self.ai_suggestions.as_slice() {
            [only] if only.question == "Error" => Some(only.answer.as_str()),
            _ => None,
        }
    }
}

/// The suggestion list is model output parsed by the backend; anything other
/// than a list of objects is dropped.
fn suggestion_list<'de, D>(deserializer: D) -> std::result::Result<Vec<AiSuggestion>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let serde_json::Value::Array(items) = value else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<AiSuggestion>(item).ok())
        .filter(|s| !s.question.is_empty() || !s.answer.is_empty())
        .collect())
}

/// Upload a resume and job description for analysis.
///
/// No input validation happens here; see
/// [`MatchRequest`](crate::matcher::MatchRequest).
pub async fn upload_resume(
    client: &ApiClient,
    resume: UploadFile,
    job_description: &str,
) -> Result<MatchReport> {
    let form = Form::new()
        .part("resume", resume.into_part()?)
        .text("job_description", job_description.to_string());
    let request = client.request(Method::POST, "/upload-resume/")?.multipart(form);
    tracing::debug!("submitting resume for matching");
    client.send_json(request).await
}
