//! Session command handlers

use super::Context;
use crate::error::{CliError, Result};
use crate::output::{json_output, print_info, print_success};
use chrono::{DateTime, Utc};
use color_eyre::eyre::eyre;
use opsdesk_sdk::session::ExpiryStatus;
use opsdesk_sdk::{ApiError, Credentials, RefreshOutcome};
use serde::Serialize;
use tracing::debug;

/// Machine-readable session summary
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub signed_in: bool,
    pub employee_id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub expiry: &'static str,
}

/// Handle login command
pub async fn handle_login(ctx: &Context, email: String, password: Option<String>) -> Result<()> {
    let password = match password {
        Some(password) => password,
        None => dialoguer::Password::new()
            .with_prompt("Password")
            .interact()
            .map_err(|e| eyre!("Failed to read password: {}", e))?,
    };

    debug!("Starting login for {}", email);
    let session = ctx
        .controller
        .login(&Credentials::new(email.as_str(), password))
        .await?;

    if ctx.json {
        return json_output(&status_report(ctx));
    }
    let who = session
        .profile
        .map(|p| if p.name.is_empty() { p.email } else { p.name })
        .unwrap_or(email);
    print_success(&format!("Signed in as {who}"));
    Ok(())
}

/// Handle logout command
pub async fn handle_logout(ctx: &Context) -> Result<()> {
    let was_signed_in = ctx.controller.session().is_authenticated();
    ctx.controller.logout().await;

    if was_signed_in {
        print_success("Signed out");
    } else {
        print_info("No active session");
    }
    Ok(())
}

/// Handle status command
pub fn handle_status(ctx: &Context) -> Result<()> {
    let report = status_report(ctx);
    if ctx.json {
        return json_output(&report);
    }

    if !report.signed_in {
        print_info("Not signed in");
        return Ok(());
    }

    let who = match (&report.name, &report.email) {
        (Some(name), Some(email)) if !name.is_empty() => format!("{name} <{email}>"),
        (_, Some(email)) => email.clone(),
        _ => "unknown user".to_string(),
    };
    print_success(&format!("Signed in as {who}"));
    if let Some(id) = &report.employee_id {
        println!("  Employee ID: {id}");
    }
    match report.expires_at {
        Some(at) => println!("  Token expires: {} ({})", at.to_rfc3339(), report.expiry),
        None => println!("  Token expires: unknown"),
    }
    Ok(())
}

/// Handle refresh command
pub async fn handle_refresh(ctx: &Context) -> Result<()> {
    if !ctx.controller.session().is_authenticated() {
        return Err(CliError::invalid_input(
            "Not signed in. Run `opsdesk login` first.",
        ));
    }

    match ctx.controller.coordinator().refresh().await {
        RefreshOutcome::Refreshed => {
            if ctx.json {
                return json_output(&status_report(ctx));
            }
            print_success("Access token refreshed");
            Ok(())
        }
        RefreshOutcome::Failed(failure) if failure.is_transport() => Err(ApiError::Network {
            message: format!("Session kept, the server could not be reached: {failure}"),
        }
        .into()),
        RefreshOutcome::Failed(failure) => {
            ctx.controller.force_logout();
            Err(ApiError::Authentication {
                message: format!("Session expired: {failure}"),
            }
            .into())
        }
    }
}

pub fn status_report(ctx: &Context) -> StatusReport {
    let session = ctx.controller.session().snapshot();
    let profile = session.profile.clone();
    let expiry = match ctx.controller.coordinator().expiry_status() {
        ExpiryStatus::Unknown => "unknown",
        ExpiryStatus::Expired => "expired",
        ExpiryStatus::ExpiringSoon => "expiring soon",
        ExpiryStatus::Valid => "valid",
    };

    StatusReport {
        signed_in: session.is_authenticated(),
        employee_id: profile.as_ref().map(|p| p.id.clone()),
        name: profile.as_ref().map(|p| p.name.clone()),
        email: profile.map(|p| p.email),
        expires_at: session
            .expiration_ms
            .and_then(DateTime::<Utc>::from_timestamp_millis),
        expiry,
    }
}
