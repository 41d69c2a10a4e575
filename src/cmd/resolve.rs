use anyhow::Result;

use qiyi::{ErrorKind, ResolveError, Resolver, ResolverConfig, VideoResolutionResult};

/// Print the resolution payload. Returns `true` when the caller should exit
/// non-zero.
///
/// Every payload the pipeline produces exits 0, failures included, so callers
/// can read the structured error from stdout. Only a rejected URL and setup
/// failures (config, client) exit 1; setup failures still print the same
/// JSON shape.
pub async fn cmd_resolve(config: Result<ResolverConfig>, url: &str, compact: bool) -> Result<bool> {
    let resolver = config.and_then(|config| Ok(Resolver::from_config(config)?));

    let (result, setup_failed) = match resolver {
        Ok(resolver) => (resolver.resolve(url).await, false),
        Err(e) => (VideoResolutionResult::from(ResolveError::parsing(&e)), true),
    };

    if compact {
        println!("{}", serde_json::to_string(&result)?);
    } else {
        println!("{}", result.to_json_pretty());
    }

    Ok(setup_failed || result.error_kind() == Some(ErrorKind::InvalidUrl))
}
