//! Token command - issue and inspect scoped editor tokens.

use anyhow::Result;
use clap::{Args, Subcommand};
use serde_json::json;

use keyway_auth::{TokenIssuer, TokenValidator};

use super::Context;

#[derive(Args, Debug)]
pub struct TokenArgs {
    #[command(subcommand)]
    pub command: TokenCommand,
}

#[derive(Subcommand, Debug)]
pub enum TokenCommand {
    /// Mint a token for a user id with the configured secret
    Issue {
        /// Local user id to embed in the token
        #[arg(long)]
        user_id: i64,
    },

    /// Check a token and print its claims
    Verify {
        /// The token to check
        token: String,
    },
}

pub async fn run(args: TokenArgs, ctx: &Context) -> Result<()> {
    let config = ctx.load_config()?;
    let tokens = super::token_config(&config)?;

    match args.command {
        TokenCommand::Issue { user_id } => {
            let token = TokenIssuer::new(&tokens).issue(user_id)?;
            if ctx.json_output {
                println!("{}", json!({ "user_id": user_id, "access_token": token }));
            } else {
                println!("{}", token);
            }
        }
        TokenCommand::Verify { token } => {
            let claims = TokenValidator::new(&tokens)
                .validate(&token)
                .map_err(|_| anyhow::anyhow!("invalid token"))?;
            let expires = claims
                .expires_at()
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| claims.exp.to_string());

            if ctx.json_output {
                println!(
                    "{}",
                    json!({
                        "user_id": claims.user_id,
                        "scope": claims.scope,
                        "issued_at": claims.iat,
                        "expires_at": expires,
                    })
                );
            } else {
                println!("user_id:    {}", claims.user_id);
                println!("scope:      {}", claims.scope);
                println!("expires_at: {}", expires);
            }
        }
    }
    Ok(())
}
