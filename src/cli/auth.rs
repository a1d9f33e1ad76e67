//! Auth command: obtain or renew the stored token without polling.

use crate::cli::args::AuthArgs;
use crate::cli::context::AppContext;
use crate::core::credentials::CodePrompt;
use crate::error::Result;
use crate::storage::ConfigOverrides;

/// Make sure a valid token is stored, refreshing or re-authorizing as needed.
///
/// # Errors
/// Configuration errors, or any failure of the authorization flow.
pub async fn execute<P: CodePrompt>(
    args: &AuthArgs,
    overrides: &ConfigOverrides,
    prompt: &mut P,
) -> Result<()> {
    let ctx = AppContext::load(overrides)?;
    let client = ctx.authorize(prompt, args.force).await?;

    // Forces a refresh (and save) when the stored access token has expired.
    client.bearer().await?;
    let token = client.current_token().await;

    println!("Authorized. Token stored at {}", ctx.config.token_file.display());
    match token.expiry {
        Some(expiry) => println!("Access token valid until {}", expiry.to_rfc3339()),
        None => println!("Access token has no recorded expiry"),
    }
    if token.refresh_token.is_none() {
        println!("No refresh token was issued; run `dqa auth --force` when it expires");
    }
    Ok(())
}
