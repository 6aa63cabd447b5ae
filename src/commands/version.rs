//! Version command implementation

use anyhow::{Context, Result};
use serde::Serialize;

use crate::config::RuntimeContext;
use crate::output::output_for_format;

#[derive(Debug, Serialize)]
struct VersionInfo {
    host: String,
    interface_version: Option<String>,
}

pub async fn run(ctx: &RuntimeContext) -> Result<()> {
    let session = ctx.session()?;
    let version = session
        .version()
        .await
        .with_context(|| format!("querying version from {}", session.host()))?;

    let info = VersionInfo {
        host: session.host().to_string(),
        interface_version: version,
    };

    output_for_format(ctx, &info, || {
        match &info.interface_version {
            Some(version) => println!("JSON interface {version} at {}", info.host),
            None => println!("{} did not report a JSON interface version", info.host),
        }
        Ok(())
    })
}
