use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Default OAuth callback port
pub const OAUTH_CALLBACK_PORT: u16 = 8080;

/// Scope that allows rating videos on the authenticated account
pub const YOUTUBE_RATING_SCOPE: &str = "https://www.googleapis.com/auth/youtube.force-ssl";

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// OAuth client credentials, as downloaded from the Google Cloud Console.
///
/// The console wraps the values in an `installed` object for desktop
/// applications (or `web` for web applications); both layouts are accepted.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecrets {
    /// OAuth client ID
    pub client_id: String,
    /// OAuth client secret
    pub client_secret: String,
}

#[derive(Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

impl ClientSecrets {
    /// Load client secrets from a Google `client_secrets.json` file
    pub fn load(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read client secrets file '{}': {}", path, e))?;
        let file: ClientSecretsFile = serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse client secrets file '{}': {}", path, e))?;
        file.installed.or(file.web).ok_or_else(|| {
            format!(
                "Client secrets file '{}' has neither an 'installed' nor a 'web' section",
                path
            )
            .into()
        })
    }
}

/// OAuth 2.0 token information persisted between runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredToken {
    /// Access token for API requests
    pub access_token: String,
    /// Refresh token for getting new access tokens
    pub refresh_token: String,
    /// Token type (usually "Bearer")
    pub token_type: String,
    /// Expiry time as Unix timestamp (seconds since epoch)
    pub expires_at: u64,
}

impl StoredToken {
    /// Check if the token is expired or will expire soon (within 60 seconds)
    pub fn is_expired(&self) -> bool {
        let now = unix_now();
        // Consider token expired if it expires within 60 seconds
        now + 60 >= self.expires_at
    }

    /// Load token from file
    pub fn load_from_file(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read OAuth token file '{}': {}", path, e))?;
        let token: StoredToken = serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse OAuth token file '{}': {}", path, e))?;
        Ok(token)
    }

    /// Save token to file with secure permissions
    pub fn save_to_file(&self, path: &str) -> Result<(), Box<dyn std::error::Error>> {
        let content = serde_json::to_string_pretty(self)?;

        std::fs::write(path, content)
            .map_err(|e| format!("Failed to write OAuth token file '{}': {}", path, e))?;

        // Owner read/write only on Unix-like systems
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(path, permissions).map_err(|e| {
                format!("Failed to set permissions on token file '{}': {}", path, e)
            })?;
        }

        Ok(())
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_secs()
}

/// OAuth configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// OAuth client ID
    pub client_id: String,
    /// OAuth client secret
    pub client_secret: String,
    /// Redirect URI for OAuth callback
    pub redirect_uri: String,
    /// OAuth scope(s)
    pub scope: String,
    /// Token endpoint (Google's in production, overridable for tests)
    pub token_url: String,
}

impl AuthConfig {
    /// Create new OAuth configuration with YouTube defaults
    pub fn new(secrets: ClientSecrets) -> Self {
        Self {
            client_id: secrets.client_id,
            client_secret: secrets.client_secret,
            redirect_uri: format!("http://localhost:{}/oauth2callback", OAUTH_CALLBACK_PORT),
            scope: YOUTUBE_RATING_SCOPE.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
        }
    }
}

/// Generate PKCE verifier and challenge
fn generate_pkce() -> (String, String) {
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use rand::Rng;
    use rand::distributions::Alphanumeric;
    use sha2::{Digest, Sha256};

    // Random verifier (43-128 characters) using a cryptographically secure RNG
    let verifier: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect();

    // Challenge: base64url(SHA256(verifier))
    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    let hash = hasher.finalize();
    let challenge = URL_SAFE_NO_PAD.encode(hash);

    (verifier, challenge)
}

/// Handles token loading, refresh, and the interactive authorization flow
pub struct Authenticator {
    config: AuthConfig,
    token: Option<StoredToken>,
}

impl Authenticator {
    /// Create new authenticator
    pub fn new(config: AuthConfig) -> Self {
        Self {
            config,
            token: None,
        }
    }

    /// Load token from file
    pub fn load_token(&mut self, path: &str) -> Result<(), Box<dyn std::error::Error>> {
        self.token = Some(StoredToken::load_from_file(path)?);
        Ok(())
    }

    /// Whether a token is currently loaded
    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Get valid access token, refreshing if necessary
    pub async fn access_token(&mut self) -> Result<String, Box<dyn std::error::Error>> {
        let token = self.token.as_ref().ok_or("No OAuth token loaded")?;

        if token.is_expired() {
            eprintln!("Access token expired, refreshing...");
            self.refresh().await?;
        }

        Ok(self
            .token
            .as_ref()
            .expect("Token should exist after refresh")
            .access_token
            .clone())
    }

    /// Refresh the access token using the refresh token
    pub async fn refresh(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let current_token = self.token.as_ref().ok_or("No OAuth token loaded")?;

        let client = reqwest::Client::new();
        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("refresh_token", current_token.refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];

        let response = client
            .post(&self.config.token_url)
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await?;
            return Err(format!(
                "Failed to refresh OAuth token (status {}): {}",
                status, body
            )
            .into());
        }

        let refresh_response: serde_json::Value = response.json().await?;

        // Google omits the refresh token from refresh responses; keep the old one
        let fallback_refresh = current_token.refresh_token.clone();
        self.token = Some(parse_token_response(
            &refresh_response,
            Some(fallback_refresh),
        )?);

        Ok(())
    }

    /// Save current token to file
    pub fn save_token(&self, path: &str) -> Result<(), Box<dyn std::error::Error>> {
        let token = self.token.as_ref().ok_or("No OAuth token to save")?;
        token.save_to_file(path)
    }

    /// Generate authorization URL
    pub fn generate_auth_url(&self) -> (String, String) {
        let (verifier, challenge) = generate_pkce();

        let auth_url = format!(
            "{}?\
            client_id={}&\
            redirect_uri={}&\
            response_type=code&\
            scope={}&\
            code_challenge={}&\
            code_challenge_method=S256&\
            access_type=offline&\
            prompt=consent",
            GOOGLE_AUTH_URL,
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(&self.config.redirect_uri),
            urlencoding::encode(&self.config.scope),
            urlencoding::encode(&challenge),
        );

        (auth_url, verifier)
    }

    /// Exchange authorization code for tokens
    pub async fn exchange_code(
        &mut self,
        code: &str,
        verifier: &str,
    ) -> Result<(), Box<dyn std::error::Error>> {
        eprintln!("Exchanging authorization code for tokens...");

        let client = reqwest::Client::new();
        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("code", code),
            ("code_verifier", verifier),
            ("grant_type", "authorization_code"),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ];

        let response = client
            .post(&self.config.token_url)
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await?;
            return Err(format!(
                "Failed to exchange authorization code (status {}): {}",
                status, body
            )
            .into());
        }

        let token_response: serde_json::Value = response.json().await?;
        self.token = Some(parse_token_response(&token_response, None)?);

        eprintln!("Successfully obtained OAuth tokens");

        Ok(())
    }

    /// Run the interactive authorization flow with a local callback server
    pub async fn authorize(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        use std::sync::Arc;
        use tokio::sync::Mutex;

        let (auth_url, verifier) = self.generate_auth_url();

        eprintln!("\n=================================================");
        eprintln!("OAuth 2.0 Authorization Required");
        eprintln!("=================================================");
        eprintln!("\nPlease visit the following URL to authorize the application:\n");
        eprintln!("{}\n", auth_url);
        eprintln!("Waiting for authorization...");
        eprintln!("=================================================\n");

        // Shared state for callback
        let code_receiver = Arc::new(Mutex::new(None::<String>));
        let code_receiver_clone = code_receiver.clone();

        use axum::{
            Router,
            extract::Query,
            response::{Html, IntoResponse},
            routing::get,
        };

        #[derive(Deserialize)]
        struct AuthCallback {
            code: Option<String>,
            error: Option<String>,
        }

        let callback_handler = move |Query(params): Query<AuthCallback>| async move {
            if let Some(error) = params.error {
                return Html(format!(
                    "<html><body><h1>Authorization Failed</h1><p>Error: {}</p>\
                    <p>You can close this window.</p></body></html>",
                    error
                ))
                .into_response();
            }

            if let Some(code) = params.code {
                *code_receiver_clone.lock().await = Some(code);
                return Html(
                    "<html><body><h1>Authorization Successful!</h1>\
                    <p>You can close this window and return to the application.</p></body></html>",
                )
                .into_response();
            }

            Html("<html><body><h1>Authorization Failed</h1><p>No code received</p></body></html>")
                .into_response()
        };

        let app = Router::new().route("/oauth2callback", get(callback_handler));

        let listener =
            tokio::net::TcpListener::bind(("127.0.0.1", OAUTH_CALLBACK_PORT)).await?;
        let server = axum::serve(listener, app);

        // Run server until we get a code
        let server_handle = tokio::spawn(async move {
            server.await.ok();
        });

        // Wait for authorization code (with timeout)
        let timeout = tokio::time::Duration::from_secs(300); // 5 minutes
        let start = tokio::time::Instant::now();

        loop {
            if start.elapsed() > timeout {
                server_handle.abort();
                return Err("OAuth authorization timeout (5 minutes)".into());
            }

            let code_opt = code_receiver.lock().await.clone();
            if let Some(code) = code_opt {
                self.exchange_code(&code, &verifier).await?;
                break;
            }

            tokio::time::sleep(tokio::time::Duration::from_millis(500)).await;
        }

        server_handle.abort();

        Ok(())
    }
}

/// Build a token from a Google token endpoint response.
///
/// `fallback_refresh` supplies the refresh token when the response omits it
/// (refresh responses do); exchange responses must carry one.
fn parse_token_response(
    value: &serde_json::Value,
    fallback_refresh: Option<String>,
) -> Result<StoredToken, Box<dyn std::error::Error>> {
    let access_token = value
        .get("access_token")
        .and_then(|v| v.as_str())
        .ok_or("Missing access_token in token response")?
        .to_string();

    let refresh_token = match value.get("refresh_token").and_then(|v| v.as_str()) {
        Some(t) => t.to_string(),
        None => fallback_refresh.ok_or("Missing refresh_token in token response")?,
    };

    let expires_in = value
        .get("expires_in")
        .and_then(|v| v.as_u64())
        .ok_or("Missing expires_in in token response")?;

    Ok(StoredToken {
        access_token,
        refresh_token,
        token_type: value
            .get("token_type")
            .and_then(|v| v.as_str())
            .unwrap_or("Bearer")
            .to_string(),
        expires_at: unix_now() + expires_in,
    })
}
