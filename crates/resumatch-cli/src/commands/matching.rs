use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::{ArgGroup, Args};
use resumatch_core::api::UploadFile;
use resumatch_core::{AiSuggestion, AuthError, CoreError, MatchRequest, MatchSession, Route};
use serde::Serialize;

use crate::context::{print_json, Context};

#[derive(Args)]
#[command(group(
    ArgGroup::new("job")
        .required(true)
        .args(["job_description", "job_description_file"]),
))]
pub struct MatchArgs {
    /// Resume file (PDF, DOCX or plain text)
    resume: PathBuf,
    /// Job description text
    #[arg(long)]
    job_description: Option<String>,
    /// Read the job description from a file
    #[arg(long)]
    job_description_file: Option<PathBuf>,
    /// Count a requirement as met, whatever the analysis said
    #[arg(long, value_name = "REQUIREMENT")]
    mark_met: Vec<String>,
    /// Count a requirement as missing; wins over --mark-met
    #[arg(long, value_name = "REQUIREMENT")]
    mark_missing: Vec<String>,
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct MatchOutput<'a> {
    score: Option<f64>,
    score_display: String,
    met: Vec<String>,
    missing: Vec<String>,
    overridden: Vec<String>,
    explanations: &'a BTreeMap<String, String>,
    suggestions: &'a [AiSuggestion],
}

pub async fn run(ctx: &Context, args: MatchArgs) -> Result<(), Box<dyn std::error::Error>> {
    let job_description = match (args.job_description, args.job_description_file) {
        (Some(text), _) => text,
        (None, Some(path)) => std::fs::read_to_string(&path)
            .map_err(|e| format!("cannot read {}: {e}", path.display()))?,
        (None, None) => String::new(),
    };
    let resume = UploadFile::from_path(&args.resume)?;
    let request = MatchRequest::new(resume, job_description);
    request.validate()?;

    let app = &ctx.app;
    if app.router.resolve(Route::Matcher, app.sessions.state()) != Route::Matcher {
        return Err(CoreError::from(AuthError::NotAuthenticated).into());
    }

    let mut session = MatchSession::new();
    session.submit(&app.client, request).await?;
    let reconciler = session.reconciler_mut();
    for label in &args.mark_met {
        reconciler.mark_met(label);
    }
    for label in &args.mark_missing {
        reconciler.mark_missing(label);
    }

    let reconciler = session.reconciler();
    let Some(report) = session.report() else {
        return Err("no match result received".into());
    };
    if let Some(message) = report.backend_error() {
        return Err(format!("analysis failed: {message}").into());
    }

    let score = reconciler.score();
    let met = reconciler.effective_met();
    let missing = reconciler.effective_missing();

    if args.json {
        let overridden = met
            .iter()
            .chain(&missing)
            .filter(|l| reconciler.is_overridden(l))
            .cloned()
            .collect();
        return print_json(&MatchOutput {
            score: score.percent(),
            score_display: score.to_string(),
            met,
            missing,
            overridden,
            explanations: &report.requirement_explanations,
            suggestions: &report.ai_suggestions,
        });
    }

    let total = reconciler.total_requirements().len();
    match score.percent() {
        Some(_) => println!("score: {score}% ({} of {total} requirements met)", met.len()),
        None => println!("score: {score}"),
    }

    let print_group = |title: &str, labels: &[String]| {
        if labels.is_empty() {
            return;
        }
        println!();
        println!("{title}:");
        for label in labels {
            let flag = if reconciler.is_overridden(label) { " *" } else { "" };
            println!("  - {label}{flag}");
            if let Some(explanation) = report.explanation(label) {
                println!("      {explanation}");
            }
        }
    };
    print_group("met", &met);
    print_group("missing", &missing);

    if !report.ai_suggestions.is_empty() {
        println!();
        println!("questions to consider:");
        for suggestion in &report.ai_suggestions {
            println!("  Q: {}", suggestion.question);
            println!("  A: {}", suggestion.answer);
        }
    }
    Ok(())
}
