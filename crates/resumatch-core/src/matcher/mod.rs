pub mod reconciler;
pub mod submission;

pub use reconciler::{MatchReconciler, Score};
pub use submission::{MatchRequest, MatchSession, ResumeFile, Ticket};
