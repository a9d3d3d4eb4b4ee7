//! Authentication command handlers for the OAuth flow.
//!
//! - `sandwiches auth` runs the consent flow once and saves the tokens
//! - `sandwiches auth --verify` checks that the saved tokens still work

use crate::api::TokenProvider;
use crate::commands::Out;
use crate::{Config, Result};
use anyhow::Context;
use std::io::{BufRead, Write};

/// Handles `sandwiches auth`. Prints the Google consent URL to stdout, reads the pasted redirect
/// address from stdin and saves the tokens to the token file.
pub async fn auth(config: &Config) -> Result<Out<()>> {
    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let mut output = std::io::stdout();
    auth_with(config, &mut input, &mut output).await
}

async fn auth_with<R, W>(config: &Config, input: &mut R, output: &mut W) -> Result<Out<()>>
where
    R: BufRead + ?Sized,
    W: Write + ?Sized,
{
    let _ = TokenProvider::initialize(
        config.client_secret_path(),
        config.token_path(),
        input,
        output,
    )
    .await?;
    Ok("Authorization complete, you can now run 'sandwiches submit'".into())
}

/// Handles `sandwiches auth --verify`. This never prompts: if the saved tokens are missing, were
/// granted the wrong scopes or cannot be refreshed, it fails and tells the user to run
/// `sandwiches auth`.
pub async fn auth_verify(config: &Config) -> Result<Out<()>> {
    let mut token_provider = TokenProvider::load(config.client_secret_path(), config.token_path())
        .await
        .context(
            "Unable to use the existing tokens found in the token JSON file. \n\n\
            You should run 'sandwiches auth' (without the --verify flag).",
        )?;
    token_provider
        .refresh()
        .await
        .context("Unable to refresh the token")?;
    Ok("Your OAuth token is valid!".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::TestEnv;
    use std::io::Cursor;

    #[tokio::test]
    async fn test_verify_without_token() {
        let env = TestEnv::new().await;
        let e = auth_verify(&env.config()).await.unwrap_err();
        assert!(format!("{e:#}").contains("sandwiches auth"));
    }

    #[tokio::test]
    async fn test_auth_without_pasted_code() {
        let env = TestEnv::new().await;
        let mut input = Cursor::new("\n");
        let mut output = Vec::new();

        let e = auth_with(&env.config(), &mut input, &mut output)
            .await
            .unwrap_err();
        assert!(e.to_string().contains("No authorization code"));

        let shown = String::from_utf8(output).unwrap();
        assert!(shown.contains("https://accounts.google.com/o/oauth2/auth"));
        assert!(shown.contains("code_challenge"));
        assert!(!env.config().token_path().exists());
    }
}
