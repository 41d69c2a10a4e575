use anyhow::{Context, Result};

use qiyi::iqiyi::{SigningContext, StreamRequestBuilder};
use qiyi::{ResolverConfig, SigningCapability, VideoIdentity};

/// Sign a manifest request for the given ids and print it, unsent.
pub fn cmd_sign(config: &ResolverConfig, tvid: &str, vid: &str, tm: Option<i64>) -> Result<()> {
    let path = config.signer_script_path();
    let signing = SigningCapability::load_script(&path);
    let signer = signing
        .engine()
        .with_context(|| format!("no usable signing script at {}", path.display()))?;

    let identity = VideoIdentity::new(tvid, vid).context("tvid and vid must be non-empty")?;
    let ctx = tm.map_or_else(SigningContext::now, SigningContext::at);

    let request = StreamRequestBuilder::new(signer, &config.dash_path).sign(&identity, &ctx)?;

    let output = serde_json::json!({
        "endpoint": config.dash_endpoint,
        "tm": ctx.timestamp_millis,
        "auth_key": request.auth_key,
        "vf": request.verification_token,
        "params": request.params.as_slice(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
