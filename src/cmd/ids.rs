use anyhow::Result;

use qiyi::iqiyi::{IdentifierResolver, ResolutionRequest};
use qiyi::{AcceleratedClient, ResolverConfig};

pub async fn cmd_ids(config: &ResolverConfig, url: &str) -> Result<()> {
    let request = ResolutionRequest::new(url, config)?;
    let client = AcceleratedClient::from_config(config)?;

    let (identity, source) = IdentifierResolver::new(&client, config)
        .resolve_with_source(request.url())
        .await?;

    let output = serde_json::json!({
        "tvid": identity.primary_id,
        "vid": identity.secondary_id,
        "source": source,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
