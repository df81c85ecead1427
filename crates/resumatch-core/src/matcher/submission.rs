//! Match request validation and response sequencing.

use crate::api::matching::{self, MatchReport};
use crate::api::UploadFile;
use crate::error::{Result, ValidationError};
use crate::http::ApiClient;

use super::reconciler::MatchReconciler;

pub type ResumeFile = UploadFile;

/// Inputs of one match run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRequest {
    pub resume: Option<ResumeFile>,
    pub job_description: String,
}

impl MatchRequest {
    pub fn new(resume: ResumeFile, job_description: impl Into<String>) -> Self {
        Self {
            resume: Some(resume),
            job_description: job_description.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match &self.resume {
            Some(file) if !file.is_empty() => {}
            _ => return Err(ValidationError::MissingField("resume".to_string())),
        }
        if self.job_description.trim().is_empty() {
            return Err(ValidationError::MissingField("job_description".to_string()));
        }
        Ok(())
    }
}

/// Identifies one issued request. Only the newest ticket is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

/// The matcher view's state: reconciler, last report and request sequence.
#[derive(Debug, Default)]
pub struct MatchSession {
    reconciler: MatchReconciler,
    report: Option<MatchReport>,
    issued: u64,
}

impl MatchSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reconciler(&self) -> &MatchReconciler {
        &self.reconciler
    }

    pub fn reconciler_mut(&mut self) -> &mut MatchReconciler {
        &mut self.reconciler
    }

    pub fn report(&self) -> Option<&MatchReport> {
        self.report.as_ref()
    }

    /// Issue a ticket for a new request, invalidating earlier ones.
    pub fn begin(&mut self) -> Ticket {
        self.issued += 1;
        Ticket(self.issued)
    }

    /// Apply `report` if `ticket` is the newest issued. Stale reports are
    /// dropped and `false` is returned.
    pub fn accept(&mut self, ticket: Ticket, report: MatchReport) -> bool {
        if ticket.0 != self.issued {
            tracing::debug!(ticket = ticket.0, latest = self.issued, "dropping stale match response");
            return false;
        }
        self.reconciler
            .set_server_result(&report.met_requirements, &report.missing_requirements);
        self.report = Some(report);
        true
    }

    /// The inputs changed: forget the result and any overrides.
    pub fn clear(&mut self) {
        self.reconciler.reset();
        self.report = None;
    }

    /// Validate, send and apply. Returns whether the response was applied.
    pub async fn submit(&mut self, client: &ApiClient, request: MatchRequest) -> Result<bool> {
        request.validate()?;
        let MatchRequest {
            resume,
            job_description,
        } = request;
        let resume = resume.ok_or_else(|| ValidationError::MissingField("resume".to_string()))?;

        let ticket = self.begin();
        let report = matching::upload_resume(client, resume, &job_description).await?;
        Ok(self.accept(ticket, report))
    }
}
