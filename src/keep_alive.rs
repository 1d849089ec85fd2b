//! Keep-alive self-ping task.
//!
//! Free-tier hosts put idle services to sleep; this task pings the service's
//! own health endpoint at a random 4-6 minute interval to keep it warm. It
//! is pure operational scaffolding: it never touches request handling and
//! its failures are only logged.

use rand::Rng;
use std::time::Duration;

/// Spawn the background pinger against the service's public URL.
pub fn spawn(app_url: String) {
    tokio::spawn(async move {
        let client = match reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
        {
            Ok(client) => client,
            Err(e) => {
                tracing::error!("Keep-alive disabled, HTTP client build failed: {e}");
                return;
            }
        };

        let target = format!("{}/health", app_url.trim_end_matches('/'));
        tracing::info!("Keep-alive service started for {target}");

        loop {
            // Random jitter so the pings don't look like a fixed cron to
            // the host's idle detector.
            let interval = rand::rng().random_range(240..=360);
            tokio::time::sleep(Duration::from_secs(interval)).await;

            match client.get(&target).send().await {
                Ok(resp) if resp.status().is_success() => {
                    tracing::debug!("Keep-alive ping successful");
                }
                Ok(resp) => {
                    tracing::warn!("Keep-alive ping returned status {}", resp.status());
                }
                Err(e) => {
                    tracing::warn!("Keep-alive ping failed: {e}");
                }
            }
        }
    });
}
