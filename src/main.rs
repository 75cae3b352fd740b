use clap::Parser;
use std::io::{self, BufRead, Write};
use std::time::Duration;

mod playlist;
mod rate;

/// Like every video in a YouTube playlist on the authenticated account
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Playlist URL or playlist ID
    playlist: String,

    /// Don't actually like videos; just list them
    #[arg(long)]
    dry_run: bool,

    /// Seconds to wait between likes
    #[arg(long, default_value = "1.0")]
    delay: f64,

    /// Path to OAuth client secrets JSON
    #[arg(long, default_value = "client_secrets.json")]
    credentials: String,

    /// Path to store OAuth token JSON
    #[arg(long, default_value = "token.json")]
    token: String,

    /// Skip confirmation prompt
    #[arg(long)]
    yes: bool,
}

/// Per-run counts printed at the end
struct Summary {
    attempted: usize,
    succeeded: usize,
    failed: usize,
}

/// Confirmation gate before any rating call; `yes` bypasses the prompt
fn proceed(yes: bool, input: &mut impl BufRead) -> io::Result<bool> {
    if yes {
        return Ok(true);
    }

    print!("Proceed to like these videos on the authenticated account? (y/N): ");
    io::stdout().flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}

/// Rate every video in order, sleeping `delay` between calls.
///
/// Dry-run lists the videos without touching the rating endpoint. A failed
/// video is counted and the run continues with the next one.
async fn like_all(
    rater: &rate::VideoRater,
    video_ids: &[String],
    dry_run: bool,
    delay: Duration,
) -> Summary {
    let total = video_ids.len();
    let mut summary = Summary {
        attempted: total,
        succeeded: 0,
        failed: 0,
    };

    for (i, video_id) in video_ids.iter().enumerate() {
        let position = i + 1;

        if dry_run {
            println!("[{}/{}] {} (dry run)", position, total, video_id);
            continue;
        }

        match rater.rate_like(video_id).await {
            Ok(()) => {
                println!("[{}/{}] Liked {}", position, total, video_id);
                summary.succeeded += 1;
            }
            Err(e) => {
                eprintln!("[{}/{}] Failed to like {}: {}", position, total, video_id, e);
                summary.failed += 1;
            }
        }

        tokio::time::sleep(delay).await;
    }

    summary
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let playlist_id = playlist::extract_playlist_id(&args.playlist)?;
    eprintln!("Using playlist id: {}", playlist_id);
    if !playlist::has_known_prefix(&playlist_id) {
        eprintln!(
            "Warning: '{}' does not look like a playlist ID; passing it to the API as-is",
            playlist_id
        );
    }

    if args.dry_run {
        eprintln!("DRY RUN: no rating calls will be made.");
    }

    // Listing a playlist's items needs credentials too, so authenticate even
    // in dry-run mode.
    let secrets = yt_auth::ClientSecrets::load(&args.credentials).map_err(|e| {
        format!(
            "{}\nCreate an OAuth 2.0 client (type: Desktop) in the Google Cloud Console \
            and download its JSON. Note: Google app passwords do not work with the \
            YouTube Data API.",
            e
        )
    })?;
    let mut auth = yt_auth::Authenticator::new(yt_auth::AuthConfig::new(secrets));

    if std::path::Path::new(&args.token).exists() {
        if let Err(e) = auth.load_token(&args.token) {
            eprintln!("Ignoring unusable token file: {}", e);
        }
    }

    let access_token = match auth.access_token().await {
        Ok(token) => token,
        Err(e) => {
            if auth.has_token() {
                eprintln!("Stored token unusable ({}); starting authorization flow", e);
            }
            auth.authorize().await?;
            auth.access_token().await?
        }
    };
    auth.save_token(&args.token)?;

    let api_base = playlist::default_api_base();
    let playlist_client =
        playlist::PlaylistClient::with_base_url(api_base.clone(), access_token.clone());
    let video_ids = playlist_client
        .list_video_ids(&playlist_id)
        .await
        .map_err(|e| format!("API error while fetching playlist items: {}", e))?;

    if video_ids.is_empty() {
        eprintln!("No videos found in the playlist (it may be private or empty). Exiting.");
        return Ok(());
    }

    eprintln!("Found {} videos in playlist.", video_ids.len());
    if !proceed(args.yes, &mut io::stdin().lock())? {
        eprintln!("Aborted by user.");
        return Ok(());
    }

    let rater = rate::VideoRater::with_base_url(api_base, access_token);
    let delay = Duration::from_secs_f64(args.delay.max(0.0));
    let summary = like_all(&rater, &video_ids, args.dry_run, delay).await;

    println!("\nSummary:");
    println!("  Attempted: {}", summary.attempted);
    println!("  Succeeded: {}", summary.succeeded);
    println!("  Failed:    {}", summary.failed);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use std::io::Cursor;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn prompt_accepts_y_and_rejects_everything_else() {
        assert!(proceed(false, &mut Cursor::new("y\n")).unwrap());
        assert!(proceed(false, &mut Cursor::new("Y\n")).unwrap());
        assert!(!proceed(false, &mut Cursor::new("n\n")).unwrap());
        assert!(!proceed(false, &mut Cursor::new("yes\n")).unwrap());
        assert!(!proceed(false, &mut Cursor::new("\n")).unwrap());
        assert!(!proceed(false, &mut Cursor::new("")).unwrap());
    }

    #[test]
    fn prompt_is_skipped_only_with_yes_flag() {
        // with --yes the input is never consulted
        assert!(proceed(true, &mut Cursor::new("")).unwrap());
        // without it, an empty answer means no
        assert!(!proceed(false, &mut Cursor::new("")).unwrap());
    }

    #[tokio::test]
    async fn rates_each_video_exactly_once() {
        let server = MockServer::start();
        let video_ids = ids(&["vid-1", "vid-2", "vid-3"]);
        let mocks: Vec<_> = video_ids
            .iter()
            .map(|id| {
                server.mock(|when, then| {
                    when.method(POST)
                        .path("/youtube/v3/videos/rate")
                        .query_param("id", id)
                        .query_param("rating", "like");
                    then.status(204);
                })
            })
            .collect();

        let rater = rate::VideoRater::with_base_url(server.base_url(), "tok-1".to_string());
        let summary = like_all(&rater, &video_ids, false, Duration::ZERO).await;

        for mock in &mocks {
            mock.assert_hits(1);
        }
        assert_eq!(summary.attempted, 3);
        assert_eq!(summary.succeeded, 3);
        assert_eq!(summary.failed, 0);
    }

    #[tokio::test]
    async fn dry_run_makes_no_rating_calls() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/youtube/v3/videos/rate");
            then.status(204);
        });

        let rater = rate::VideoRater::with_base_url(server.base_url(), "tok-1".to_string());
        let summary = like_all(&rater, &ids(&["vid-1", "vid-2"]), true, Duration::ZERO).await;

        mock.assert_hits(0);
        assert_eq!(summary.attempted, 2);
        assert_eq!(summary.succeeded, 0);
        assert_eq!(summary.failed, 0);
    }

    #[tokio::test]
    async fn counts_failures_and_continues() {
        let server = MockServer::start();
        let failing = server.mock(|when, then| {
            when.method(POST)
                .path("/youtube/v3/videos/rate")
                .query_param("id", "vid-bad");
            then.status(404).body("videoNotFound");
        });
        let succeeding = server.mock(|when, then| {
            when.method(POST)
                .path("/youtube/v3/videos/rate")
                .query_param("id", "vid-good");
            then.status(204);
        });

        let rater = rate::VideoRater::with_base_url(server.base_url(), "tok-1".to_string());
        let summary = like_all(&rater, &ids(&["vid-bad", "vid-good"]), false, Duration::ZERO).await;

        failing.assert_hits(1);
        succeeding.assert_hits(1);
        assert_eq!(summary.attempted, 2);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
    }
}
