use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use songbridge_core::{CallbackHostAllowlist, Gateway, ValidationError};
use songbridge_engine::{
    AudioLinkCache, CacheSettings, HttpProviderClient, ProviderClient, ProviderSettings,
    Reconciler,
};
use songbridge_logging::{bridge_info, bridge_warn};

use crate::cli::Family;
use crate::config::{load_config, read_json};

pub async fn validate(family: Family, file: &Path) -> Result<ExitCode> {
    let payload = read_json(file)?;
    let gateway = Gateway::new();
    let outcome = match family {
        Family::Request => gateway.validate_generation_request(&payload).await.map(|_| ()),
        Family::Callback => gateway.validate_callback(&payload).await.map(|_| ()),
        Family::Config => gateway.validate_config(&payload).await.map(|_| ()),
    };
    match outcome {
        Ok(()) => {
            println!("ok");
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            print_issues(&err)?;
            Ok(ExitCode::FAILURE)
        }
    }
}

pub async fn submit(config_path: &Path, request_path: &Path) -> Result<ExitCode> {
    let config = load_config(config_path).await?;
    let payload = read_json(request_path)?;

    let mut gateway = Gateway::new();
    if let Some(allowlist) = config.callback_url.as_deref().and_then(CallbackHostAllowlist::from_url) {
        gateway = gateway.with_request_rule(allowlist);
    }
    let request = match gateway.validate_generation_request(&payload).await {
        Ok(request) => request,
        Err(err) => {
            print_issues(&err)?;
            return Ok(ExitCode::FAILURE);
        }
    };

    let client = HttpProviderClient::new(ProviderSettings::from_config(&config))?;
    let job_id = client.submit(&request).await.context("submission failed")?;
    println!("{job_id}");
    Ok(ExitCode::SUCCESS)
}

pub async fn resolve(config_path: &Path, job_id: &str, attempts: u32, interval: Duration) -> Result<ExitCode> {
    let config = load_config(config_path).await?;
    let client = HttpProviderClient::new(ProviderSettings::from_config(&config))?;
    let cache = AudioLinkCache::new(Arc::new(client), CacheSettings::from_config(&config));
    let reconciler = Reconciler::new(Gateway::new(), cache);

    let attempts = attempts.max(1);
    for attempt in 1..=attempts {
        match reconciler.refresh(job_id).await {
            Some(links) if links.is_ready() => {
                println!("{}", serde_json::to_string_pretty(&*links)?);
                return Ok(ExitCode::SUCCESS);
            }
            Some(links) => bridge_info!(
                "Attempt {}/{}: job {} not ready (status {:?})",
                attempt,
                attempts,
                job_id,
                links.status
            ),
            None => bridge_warn!("Attempt {}/{}: no answer for job {}", attempt, attempts, job_id),
        }
        if attempt < attempts {
            tokio::time::sleep(interval).await;
        }
    }

    eprintln!("audio links for {job_id} are not available yet; try again later");
    Ok(ExitCode::FAILURE)
}

fn print_issues(err: &ValidationError) -> Result<()> {
    let rendered = serde_json::to_string_pretty(&err.issues).context("failed to render issues")?;
    eprintln!("rejected {} payload:", err.family);
    println!("{rendered}");
    Ok(())
}
