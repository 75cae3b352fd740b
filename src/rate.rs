use std::time::Duration;

/// Statuses worth retrying: quota/rate limiting and transient server errors
const RETRYABLE_STATUS: [u16; 4] = [403, 429, 500, 503];

const DEFAULT_MAX_ATTEMPTS: u32 = 4;

/// Client for the videos.rate endpoint of the YouTube Data API v3
pub struct VideoRater {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
    max_attempts: u32,
    backoff_base: Duration,
}

impl VideoRater {
    pub fn new(access_token: String) -> Self {
        Self::with_base_url(crate::playlist::default_api_base(), access_token)
    }

    pub fn with_base_url(base_url: String, access_token: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            access_token,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_base: Duration::from_secs(1),
        }
    }

    /// Set the rating of a video to "like".
    ///
    /// The API returns 204 No Content on success. Rate-limit and transient
    /// server errors are retried with exponential backoff up to 4 attempts;
    /// anything else fails immediately.
    pub async fn rate_like(&self, video_id: &str) -> Result<(), Box<dyn std::error::Error>> {
        let url = format!("{}/youtube/v3/videos/rate", self.base_url);

        for attempt in 1..=self.max_attempts {
            let response = self
                .http
                .post(&url)
                .bearer_auth(&self.access_token)
                .query(&[("id", video_id), ("rating", "like")])
                .send()
                .await?;

            if response.status().is_success() {
                return Ok(());
            }

            let status = response.status();
            if RETRYABLE_STATUS.contains(&status.as_u16()) && attempt < self.max_attempts {
                let wait = self.backoff_base * 2u32.pow(attempt);
                eprintln!(
                    "Rating {} failed with status {}, retrying in {:.1}s (attempt {}/{})",
                    video_id,
                    status.as_u16(),
                    wait.as_secs_f64(),
                    attempt,
                    self.max_attempts
                );
                tokio::time::sleep(wait).await;
                continue;
            }

            let body = response.text().await.unwrap_or_default();
            return Err(format!(
                "Failed to rate video '{}' (status {}): {}",
                video_id,
                status.as_u16(),
                body
            )
            .into());
        }

        Err(format!("Failed to rate video '{}': retries exhausted", video_id).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, http::StatusCode, routing::post};
    use httpmock::prelude::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn quick_rater(base_url: String) -> VideoRater {
        let mut rater = VideoRater::with_base_url(base_url, "tok-1".to_string());
        rater.backoff_base = Duration::from_millis(5);
        rater
    }

    /// Serve the rate endpoint with a per-request status sequence; the last
    /// status repeats once the sequence is exhausted.
    async fn sequenced_server(statuses: Vec<u16>) -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = hits.clone();

        let handler = move || {
            let hits = hits_clone.clone();
            let statuses = statuses.clone();
            async move {
                let n = hits.fetch_add(1, Ordering::SeqCst);
                let code = *statuses.get(n).unwrap_or(statuses.last().unwrap());
                StatusCode::from_u16(code).unwrap()
            }
        };

        let app = Router::new().route("/youtube/v3/videos/rate", post(handler));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        (format!("http://{}", addr), hits)
    }

    #[tokio::test]
    async fn sends_like_rating_with_bearer_token() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/youtube/v3/videos/rate")
                .query_param("id", "vid-1")
                .query_param("rating", "like")
                .header("authorization", "Bearer tok-1");
            then.status(204);
        });

        let rater = quick_rater(server.base_url());
        rater.rate_like("vid-1").await.unwrap();
        mock.assert();
    }

    #[tokio::test]
    async fn retries_rate_limit_then_succeeds() {
        let (base_url, hits) = sequenced_server(vec![429, 204]).await;

        let rater = quick_rater(base_url);
        rater.rate_like("vid-1").await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn retries_transient_server_errors() {
        let (base_url, hits) = sequenced_server(vec![503, 500, 204]).await;

        let rater = quick_rater(base_url);
        rater.rate_like("vid-1").await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let (base_url, hits) = sequenced_server(vec![503]).await;

        let rater = quick_rater(base_url);
        let err = rater.rate_like("vid-1").await.unwrap_err();
        assert!(err.to_string().contains("503"));
        assert_eq!(hits.load(Ordering::SeqCst), DEFAULT_MAX_ATTEMPTS as usize);
    }

    #[tokio::test]
    async fn does_not_retry_unknown_video() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/youtube/v3/videos/rate");
            then.status(404).body("videoNotFound");
        });

        let rater = quick_rater(server.base_url());
        let err = rater.rate_like("vid-missing").await.unwrap_err();
        assert!(err.to_string().contains("404"));
        assert!(err.to_string().contains("videoNotFound"));
        mock.assert_hits(1);
    }
}
