//! Raw request handler

use super::Context;
use crate::error::{CliError, Result};
use crate::output::json_output;
use opsdesk_sdk::{ApiError, BootstrapOutcome, RequestDescriptor};
use reqwest::Method;
use serde_json::Value;

/// Handle request command
pub async fn handle_request(
    ctx: &Context,
    method: &str,
    path: &str,
    data: Option<&str>,
) -> Result<()> {
    let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .map_err(|_| CliError::invalid_input(format!("Unknown HTTP method '{method}'")))?;
    let payload = data
        .map(serde_json::from_str::<Value>)
        .transpose()
        .map_err(|e| CliError::invalid_input(format!("--data is not valid JSON: {e}")))?;

    let mounted = ctx.controller.mount().await;
    if matches!(
        mounted.bootstrap_outcome(),
        BootstrapOutcome::RedirectedToLogin | BootstrapOutcome::LoggedOut
    ) {
        return Err(ApiError::Authentication {
            message: "Not signed in".to_string(),
        }
        .into());
    }

    let mut request = RequestDescriptor::new(method, path);
    if let Some(payload) = payload {
        request = request.with_payload(payload);
    }
    let response = ctx.controller.client().request(request).await;

    if !response.ok {
        return Err(response.to_error().into());
    }

    match response.data {
        Some(Value::String(text)) if !ctx.json => println!("{text}"),
        Some(body) => json_output(&body)?,
        None => {}
    }
    Ok(())
}
