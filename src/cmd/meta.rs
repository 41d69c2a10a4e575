use anyhow::Result;

use qiyi::iqiyi::{MetadataEnricher, ResolutionRequest};
use qiyi::{AcceleratedClient, ResolverConfig};

pub async fn cmd_meta(config: &ResolverConfig, url: &str) -> Result<()> {
    let request = ResolutionRequest::new(url, config)?;
    let client = AcceleratedClient::from_config(config)?;

    let metadata = MetadataEnricher::new(&client, config)
        .enrich(request.url())
        .await;
    println!("{}", serde_json::to_string_pretty(&metadata)?);
    Ok(())
}
