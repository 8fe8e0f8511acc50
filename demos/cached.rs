use std::{sync::Arc, time::Duration};

use netkit_http::{CachePolicy, FileCacheStore, NetworkClient, RequestDescriptor, RetryPolicy};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "https://httpbin.org/uuid".to_owned());

    let cache = FileCacheStore::open(std::env::temp_dir().join("netkit-http-demo")).await?;
    let client = NetworkClient::unauthenticated().with_cache(Arc::new(cache));

    let request = RequestDescriptor::get(&url)?
        .with_cache_policy(CachePolicy::read_then_fetch(Duration::from_secs(30)))
        .with_retry_policy(RetryPolicy::new(2, Duration::from_millis(250), 2.0));

    for round in 1..=3 {
        let body = client.execute(&request).await?;
        println!("round {round}: {}", String::from_utf8_lossy(&body));
    }

    Ok(())
}
