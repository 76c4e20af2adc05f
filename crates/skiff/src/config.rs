//! Flag and environment configuration for the store connection.
//!
//! Flags override the environment; the environment fills in whatever the
//! flags leave unset. An explicit endpoint wins over the region-derived
//! host.

use anyhow::Context;
use clap::Args;
use skiff_store::{Credentials, S3Config};
use url::Url;

/// Default endpoint when neither `--endpoint` nor a region is configured.
pub const DEFAULT_ENDPOINT: &str = "https://s3.amazonaws.com";

/// Store connection options, shared by all commands.
#[derive(Debug, Args)]
pub struct StoreOpts {
    /// Object store endpoint URL.
    #[arg(long, env = "SKIFF_ENDPOINT", default_value = DEFAULT_ENDPOINT, global = true)]
    pub endpoint: Url,

    /// Region; rewrites the default endpoint host to
    /// `s3-<region>.amazonaws.com` and scopes request signatures.
    #[arg(long, env = "AWS_REGION", global = true)]
    pub region: Option<String>,

    /// Bucket holding all objects, optionally with a prefix (`bucket/sub`).
    #[arg(long, env = "SKIFF_BUCKET", global = true)]
    pub bucket: Option<String>,

    /// Access key id; requests are sent unsigned when omitted.
    #[arg(long, env = "AWS_ACCESS_KEY_ID", global = true)]
    pub access_key: Option<String>,

    /// Secret access key.
    #[arg(long, env = "AWS_SECRET_ACCESS_KEY", global = true, hide_env_values = true)]
    pub secret_key: Option<String>,

    /// STS session token.
    #[arg(long, env = "AWS_SESSION_TOKEN", global = true, hide_env_values = true)]
    pub session_token: Option<String>,

    /// Maximum in-flight chunk transfers.
    #[arg(long, default_value_t = skiff_engine::DEFAULT_CONCURRENCY, global = true)]
    pub concurrency: usize,
}

/// Build the store configuration, resolving endpoint and credentials.
pub fn store_config(opts: &StoreOpts) -> anyhow::Result<S3Config> {
    let root = opts
        .bucket
        .clone()
        .context("missing bucket: pass --bucket or set SKIFF_BUCKET")?;
    let endpoint = resolve_endpoint(&opts.endpoint, opts.region.as_deref())?;

    let credentials = match (&opts.access_key, &opts.secret_key) {
        (Some(access_key_id), Some(secret_access_key)) => Some(Credentials {
            access_key_id: access_key_id.clone(),
            secret_access_key: secret_access_key.clone(),
            session_token: opts.session_token.clone(),
        }),
        (Some(_), None) => anyhow::bail!("--access-key given without --secret-key"),
        (None, _) => None,
    };

    Ok(S3Config {
        endpoint,
        root,
        region: opts
            .region
            .clone()
            .unwrap_or_else(|| "us-east-1".to_owned()),
        credentials,
    })
}

/// An explicit endpoint wins; otherwise a configured region rewrites the
/// default host to its regional form.
fn resolve_endpoint(endpoint: &Url, region: Option<&str>) -> anyhow::Result<Url> {
    if let Some(region) = region
        && endpoint.as_str().trim_end_matches('/') == DEFAULT_ENDPOINT
    {
        let regional = format!("https://s3-{region}.amazonaws.com");
        return Url::parse(&regional).with_context(|| format!("invalid endpoint '{regional}'"));
    }
    Ok(endpoint.clone())
}
