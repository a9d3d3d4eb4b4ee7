//! OAuth 2.0 for the Google Sheets API.
//!
//! `TokenProvider` holds the client credentials and the token file. It can:
//! - run the consent flow once, for `sandwiches auth`, saving the tokens to the token file
//! - load saved tokens and refresh the access token when it is about to expire

use crate::api::files::{File, SecretFile, TokenFile, REDIRECT};
use crate::api::OAUTH_SCOPES;
use crate::Result;
use anyhow::{bail, Context};
use chrono::Utc;
use oauth2::basic::{BasicClient, BasicTokenResponse};
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    PkceCodeChallenge, RedirectUrl, RefreshToken, Scope, TokenResponse, TokenUrl,
};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing::{debug, info};
use url::Url;

type Client = BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Provides a valid access token for the Sheets API, refreshing it from Google when needed.
pub(crate) struct TokenProvider {
    client: Client,
    http: reqwest::Client,
    token: File<TokenFile>,
}

impl TokenProvider {
    /// Loads the client credentials and saved tokens. This never prompts; if the token file is
    /// missing or was granted the wrong scopes the user needs to run `sandwiches auth`.
    pub(crate) async fn load(
        client_secret_path: impl Into<PathBuf>,
        token_path: impl Into<PathBuf>,
    ) -> Result<Self> {
        let secret = SecretFile::load(&client_secret_path.into()).await?;
        let token: File<TokenFile> = File::load(token_path)
            .await
            .context("No saved OAuth token was found, run 'sandwiches auth' first")?;
        token.data().validate_scopes()?;
        Ok(Self {
            client: oauth_client(&secret)?,
            http: http_client()?,
            token,
        })
    }

    /// Runs the OAuth consent flow and saves the new tokens to `token_path`.
    ///
    /// The authorization URL is shown on `output`. After consenting, the browser is sent to
    /// `http://localhost/?code=...`; the user pastes that address (or just the code) into `input`.
    pub(crate) async fn initialize<R, W>(
        client_secret_path: impl Into<PathBuf>,
        token_path: impl Into<PathBuf>,
        input: &mut R,
        output: &mut W,
    ) -> Result<Self>
    where
        R: BufRead + ?Sized,
        W: Write + ?Sized,
    {
        let secret = SecretFile::load(&client_secret_path.into()).await?;
        let client = oauth_client(&secret)?;
        let http = http_client()?;

        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
        let (auth_url, csrf_token) = client
            .authorize_url(CsrfToken::new_random)
            .add_scopes(OAUTH_SCOPES.iter().map(|s| Scope::new(s.to_string())))
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent")
            .set_pkce_challenge(pkce_challenge)
            .url();

        writeln!(output, "Open this address in your browser and allow access:\n")?;
        writeln!(output, "{auth_url}\n")?;
        writeln!(
            output,
            "Your browser will then fail to load a page on {REDIRECT}. Copy that page's address \
            from the address bar and paste it here."
        )?;
        write!(output, "Address or code: ")?;
        output.flush()?;

        let mut line = String::new();
        input
            .read_line(&mut line)
            .context("Unable to read the authorization code")?;
        let code = authorization_code(line.trim(), csrf_token.secret())?;

        let response = client
            .exchange_code(AuthorizationCode::new(code))
            .set_pkce_verifier(pkce_verifier)
            .request_async(&http)
            .await
            .context("Failed to exchange the authorization code for tokens")?;

        let refresh_token = response
            .refresh_token()
            .map(|rt| rt.secret().to_string())
            .context("Google did not return a refresh token")?;
        let scopes = match response.scopes() {
            Some(scopes) => scopes.iter().map(|s| s.to_string()).collect(),
            None => OAUTH_SCOPES.iter().map(|s| s.to_string()).collect(),
        };
        let data = TokenFile::new(
            scopes,
            response.access_token().secret().to_string(),
            refresh_token,
            expiry(&response),
        );
        data.validate_scopes()
            .context("Access to Google Sheets was not granted")?;

        let token = File::new(token_path, data);
        token.save().await?;
        info!("Authorization successful, tokens saved to {}", token.path().display());

        Ok(Self {
            client,
            http,
            token,
        })
    }

    /// Exchanges the refresh token for a new access token and saves it.
    pub(crate) async fn refresh(&mut self) -> Result<()> {
        debug!("Refreshing the OAuth access token");
        let refresh_token = RefreshToken::new(self.token.data().refresh_token().to_string());
        let response = self
            .client
            .exchange_refresh_token(&refresh_token)
            .request_async(&self.http)
            .await
            .context("Failed to refresh the OAuth access token, try running 'sandwiches auth'")?;

        let expires_at = expiry(&response);
        self.token.data_mut().update(
            response.access_token().secret().to_string(),
            expires_at,
            response.refresh_token().map(|rt| rt.secret().to_string()),
        );
        self.token.save().await?;
        debug!("Token valid until: {}", self.token.data().expires_at());
        Ok(())
    }

    /// The current access token, refreshed first if it expires within a few minutes.
    pub(crate) async fn token_with_refresh(&mut self) -> Result<&str> {
        if self.token.data().is_expired() {
            self.refresh().await?;
        }
        Ok(self.token.data().access_token())
    }
}

fn oauth_client(secret: &SecretFile) -> Result<Client> {
    Ok(BasicClient::new(ClientId::new(secret.client_id().to_string()))
        .set_client_secret(ClientSecret::new(secret.client_secret().to_string()))
        .set_auth_uri(AuthUrl::new(secret.auth_uri().to_string()).context("Invalid auth_uri")?)
        .set_token_uri(TokenUrl::new(secret.token_uri().to_string()).context("Invalid token_uri")?)
        .set_redirect_uri(RedirectUrl::new(REDIRECT.to_string()).context("Invalid redirect")?))
}

fn http_client() -> Result<reqwest::Client> {
    reqwest::ClientBuilder::new()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .context("Unable to create the HTTP client")
}

fn expiry(response: &BasicTokenResponse) -> chrono::DateTime<Utc> {
    let lifetime = response
        .expires_in()
        .and_then(|d| chrono::Duration::from_std(d).ok())
        .unwrap_or_else(|| chrono::Duration::hours(1));
    Utc::now() + lifetime
}

/// Pulls the authorization code out of what the user pasted: either the whole redirect address or
/// the bare code. When an address is pasted its `state` must match `expected_state`.
fn authorization_code(pasted: &str, expected_state: &str) -> Result<String> {
    if pasted.is_empty() {
        bail!("No authorization code was entered");
    }
    let url = match Url::parse(pasted) {
        Ok(url) => url,
        Err(_) => return Ok(pasted.to_string()),
    };
    let mut code = None;
    let mut state = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => bail!("Authorization was refused: {value}"),
            _ => {}
        }
    }
    if state.as_deref() != Some(expected_state) {
        bail!("The pasted address does not belong to this authorization request");
    }
    code.context("The pasted address has no authorization code")
}
