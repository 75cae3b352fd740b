use clap::Parser;
use yt_auth::{AuthConfig, Authenticator, ClientSecrets};

/// OAuth 2.0 helper tool for YouTube API authentication
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the OAuth client secrets JSON file
    #[arg(long, default_value = "client_secrets.json")]
    credentials: String,

    /// Path to save the OAuth token file
    #[arg(long, default_value = "token.json")]
    token: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let secrets = ClientSecrets::load(&args.credentials)?;
    let mut auth = Authenticator::new(AuthConfig::new(secrets));

    auth.authorize().await?;
    auth.save_token(&args.token)?;

    eprintln!("Token saved to: {}", args.token);
    eprintln!("You can now run yt-playlist-liker with --token {}", args.token);

    Ok(())
}
