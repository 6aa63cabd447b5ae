//! Command implementations

pub mod completions;
pub mod config;
pub mod logfile;
pub mod status;
pub mod value;
pub mod version;

use anyhow::{anyhow, bail, Context, Result};
use oekofen::{DomainKey, HttpTransport, RefreshOutcome, Session};

use crate::config::RuntimeContext;

/// Build a session and load the full status once
async fn load(ctx: &RuntimeContext) -> Result<Session<HttpTransport>> {
    let mut session = ctx.session()?;
    let outcome = session
        .refresh()
        .await
        .with_context(|| format!("fetching data from {}", session.host()))?;

    if outcome == RefreshOutcome::Rejected {
        bail!(
            "{} did not return full status data\nHint: check the JSON interface password",
            session.host()
        );
    }
    Ok(session)
}

/// Split `hk1.temp_heat` into the domain key and attribute name
fn split_key(key: &str) -> Result<(DomainKey, &str)> {
    let (domain, attribute) = key.split_once('.').ok_or_else(|| {
        anyhow!("Invalid key format: {key}. Expected format: domain.attribute (e.g., hk1.temp_heat)")
    })?;
    if domain.is_empty() || attribute.is_empty() {
        bail!("Invalid key format: {key}. Expected format: domain.attribute (e.g., hk1.temp_heat)");
    }
    Ok((DomainKey::parse(domain), attribute))
}
