//! User command - inspect and manage accounts in the user database.

use anyhow::{Context as _, Result};
use clap::{Args, Subcommand};
use serde_json::json;

use keyway_auth::{UserRecord, UserStatus};
use keyway_store::SqliteUserStore;

use super::Context;

#[derive(Args, Debug)]
pub struct UserArgs {
    #[command(subcommand)]
    pub command: UserCommand,
}

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    /// Show a user
    Show {
        /// Local user id
        id: i64,
    },

    /// Stop a user from signing in
    Disable {
        /// Local user id
        id: i64,
    },

    /// Allow a disabled user to sign in again
    Enable {
        /// Local user id
        id: i64,
    },
}

pub async fn run(args: UserArgs, ctx: &Context) -> Result<()> {
    let config = ctx.load_config()?;
    let path = config
        .database_path()
        .context("no [database] path configured; in-memory users cannot be managed")?;
    let store = SqliteUserStore::open(&path)
        .with_context(|| format!("opening user database {}", path.display()))?;

    let (id, status) = match args.command {
        UserCommand::Show { id } => {
            let user = store
                .get(id)?
                .with_context(|| format!("user {} not found", id))?;
            print_user(&user, ctx);
            return Ok(());
        }
        UserCommand::Disable { id } => (id, UserStatus::Disabled),
        UserCommand::Enable { id } => (id, UserStatus::Enabled),
    };

    if !store.set_status(id, status)? {
        anyhow::bail!("user {} not found", id);
    }
    tracing::info!(user_id = id, ?status, "User status changed");

    if ctx.json_output {
        println!("{}", json!({ "id": id, "status": status }));
    } else {
        println!("user {} is now {:?}", id, status);
    }
    Ok(())
}

fn print_user(user: &UserRecord, ctx: &Context) {
    if ctx.json_output {
        println!("{}", json!(user));
        return;
    }
    println!("id:           {}", user.id);
    println!("username:     {}", user.username);
    println!("display_name: {}", user.display_name);
    println!("email:        {}", user.email.as_deref().unwrap_or("-"));
    println!("status:       {:?}", user.status);
    println!("role:         {:?}", user.role);
}
