use std::sync::Arc;

use netkit_http::{BearerAuth, ClientOptions, NetworkClient, RequestDescriptor};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Repository {
    full_name: String,
    stargazers_count: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let token = std::env::var("GITHUB_TOKEN")?;
    let options = ClientOptions::from_env().map_err(anyhow::Error::msg)?;

    let client = NetworkClient::new(Arc::new(BearerAuth::new(token))).with_options(ClientOptions {
        user_agent: options.user_agent.or(Some("netkit-http-demo".to_owned())),
        ..options
    });

    let request = RequestDescriptor::get("https://api.github.com/repos/rust-lang/rust")?
        .with_header("Accept", "application/vnd.github+json");

    let repository: Repository = client.execute_json(&request).await?;
    println!("{} has {} stars", repository.full_name, repository.stargazers_count);

    Ok(())
}
