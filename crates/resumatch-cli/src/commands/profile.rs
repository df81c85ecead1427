use std::path::PathBuf;

use clap::Subcommand;
use resumatch_core::api::profile::{self, ProfileUpdate};
use resumatch_core::api::UploadFile;

use crate::context::{print_json, Context};

#[derive(Subcommand)]
pub enum ProfileAction {
    /// Show your profile
    Show {
        #[arg(long)]
        json: bool,
    },
    /// Career trends picked for your profile
    Trends {
        #[arg(long)]
        json: bool,
    },
    /// Edit profile fields; only the given ones change
    Update {
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        profession: Option<String>,
        #[arg(long)]
        bio: Option<String>,
    },
    /// Upload a profile picture
    UploadImage {
        path: PathBuf,
    },
    /// Remove the profile picture
    ClearImage,
}

pub async fn run(ctx: &Context, action: ProfileAction) -> Result<(), Box<dyn std::error::Error>> {
    ctx.require_session()?;
    let client = &ctx.app.client;
    match action {
        ProfileAction::Show { json } => {
            let profile = profile::me_or_placeholder(client).await;
            if json {
                return print_json(&profile);
            }
            println!("{}", profile.display_name());
            let fields = [
                ("username", Some(profile.username.as_str()).filter(|u| !u.is_empty())),
                ("email", profile.email.as_deref()),
                ("profession", profile.profession.as_deref()),
                ("bio", profile.bio.as_deref()),
                ("image", profile.profile_image_url.as_deref()),
            ];
            for (name, value) in fields {
                if let Some(value) = value {
                    println!("{name:<11} {value}");
                }
            }
            if profile.email_verified == Some(false) {
                println!("email not verified; run `resumatch account send-code`");
            }
        }
        ProfileAction::Trends { json } => {
            let trends = profile::trends(client).await?;
            if json {
                return print_json(&trends);
            }
            if trends.is_empty() {
                println!("no trends yet; add a profession or bio to your profile");
            }
            for trend in trends {
                println!("{} {}", trend.display_tag(), trend.title);
                if let Some(subtitle) = trend.subtitle.as_deref() {
                    println!("    {subtitle}");
                }
                if let Some(url) = trend.url.as_deref() {
                    println!("    {url}");
                }
            }
        }
        ProfileAction::Update {
            first_name,
            last_name,
            email,
            profession,
            bio,
        } => {
            let update = ProfileUpdate {
                first_name,
                last_name,
                email,
                profession,
                bio,
            };
            if update.is_empty() {
                return Err("nothing to update; pass at least one field".into());
            }
            profile::update_profile(client, &update).await?;
            println!("profile updated");
        }
        ProfileAction::UploadImage { path } => {
            let image = UploadFile::from_path(&path)?;
            let uploaded = profile::upload_profile_image(client, image).await?;
            println!("profile image: {}", uploaded.profile_image_url);
        }
        ProfileAction::ClearImage => {
            profile::clear_profile_image(client).await?;
            println!("profile image removed");
        }
    }
    Ok(())
}
