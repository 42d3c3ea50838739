use folio_core::ReadinessSettings;

/// Poll `url` until it answers with a success status.
///
/// Makes at most `max_attempts` requests, sleeping `interval` between them.
/// Returns `false` once every attempt has failed.
pub async fn wait_until_ready(
    client: &reqwest::Client,
    url: &str,
    settings: &ReadinessSettings,
) -> bool {
    let max_attempts = settings.max_attempts;

    for attempt in 1..=max_attempts {
        match client.get(url).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::debug!(%url, attempt, "server responded");
                return true;
            }
            Ok(response) => {
                tracing::debug!(%url, attempt, status = %response.status(), "server not ready");
            }
            Err(e) => {
                tracing::debug!(%url, attempt, error = %e, "server unreachable");
            }
        }

        println!(
            "  Waiting for server... (attempt {}/{})",
            attempt, max_attempts
        );
        if attempt < max_attempts {
            tokio::time::sleep(settings.interval).await;
        }
    }

    false
}
