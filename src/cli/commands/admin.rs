use anyhow::{Context, bail};

use crate::config::Config;
use crate::db::Store;

pub const PASSWORD_ENV: &str = "MAMA_ADMIN_PASSWORD";

/// Takes the password from `MAMA_ADMIN_PASSWORD`, else reads one line from stdin.
fn read_password(config: &Config) -> anyhow::Result<String> {
    let password = match std::env::var(PASSWORD_ENV) {
        Ok(password) if !password.is_empty() => password,
        _ => {
            println!("Enter password:");
            let mut input = String::new();
            std::io::stdin()
                .read_line(&mut input)
                .context("Failed to read password from stdin")?;
            input.trim_end_matches(['\r', '\n']).to_string()
        }
    };

    let min = config.security.min_password_length;
    if password.chars().count() < min {
        bail!("Password must be at least {min} characters");
    }

    Ok(password)
}

async fn open_store(config: &Config) -> anyhow::Result<Store> {
    Store::with_pool_options(
        &config.general.database_url,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await
}

pub async fn cmd_create_admin(
    config: &Config,
    username: &str,
    super_admin: bool,
) -> anyhow::Result<()> {
    let username = username.trim();
    if username.is_empty() {
        bail!("Username cannot be empty");
    }

    let password = read_password(config)?;
    let store = open_store(config).await?;

    match store
        .create_admin(username, &password, super_admin, &config.security)
        .await?
    {
        Some(admin) => {
            let role = if admin.is_super_admin {
                "superadmin"
            } else {
                "admin"
            };
            println!("✓ Created {role} '{}'", admin.username);
        }
        None => println!("Admin '{username}' already exists."),
    }

    Ok(())
}

pub async fn cmd_set_password(config: &Config, username: &str) -> anyhow::Result<()> {
    let password = read_password(config)?;
    let store = open_store(config).await?;

    if store
        .update_admin_password(username.trim(), &password, &config.security)
        .await?
    {
        println!("✓ Password updated for '{}'", username.trim());
    } else {
        println!("Admin '{}' not found.", username.trim());
    }

    Ok(())
}
