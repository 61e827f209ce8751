//! Social content resolution.
//!
//! Twitter/X and LinkedIn render nothing useful to a plain fetch, so those
//! links go through a third-party content-resolution service. The service is
//! an external collaborator: one `POST {resolver_url}/resolve` call with the
//! link, JSON back with the readable content.

use serde::Deserialize;

use crate::types::{AppError, Result};
use crate::utils::config::ExtractConfig;

#[derive(Debug, Deserialize)]
struct ResolveResponse {
    content: String,
}

/// Resolve a social link to readable text.
pub async fn resolve(
    http: &reqwest::Client,
    config: &ExtractConfig,
    url: &str,
) -> Result<String> {
    if config.resolver_url.is_empty() {
        return Err(AppError::Extraction(
            "Content resolver not configured".to_string(),
        ));
    }

    let mut request = http
        .post(format!("{}/resolve", config.resolver_url.trim_end_matches('/')))
        .json(&serde_json::json!({ "url": url }));
    if let Some(key) = &config.resolver_api_key {
        request = request.bearer_auth(key);
    }

    let response = request
        .send()
        .await
        .map_err(|e| AppError::Extraction(format!("Resolver call failed for {}: {}", url, e)))?;

    if !response.status().is_success() {
        return Err(AppError::Extraction(format!(
            "Resolver returned status {} for {}",
            response.status(),
            url
        )));
    }

    let body: ResolveResponse = response
        .json()
        .await
        .map_err(|e| AppError::Extraction(format!("Bad resolver response for {}: {}", url, e)))?;

    Ok(body.content)
}
