//! One-shot CLI commands

use std::io::BufRead;

use anyhow::{Context, Result, bail};
use tracing::info;

use crate::config::StaticConfig;
use crate::rbac::SUPER_ADMIN_ROLE;
use crate::rbac::legacy::MIGRATED_FLAT_ROLE;
use crate::storage::{NewUser, StorageFactory};
use crate::utils::hash_password;

const MIN_PASSWORD_LEN: usize = 8;
const DEFAULT_ROLE: &str = "User";

fn read_password(password: Option<String>, stdin: bool) -> Result<String> {
    match (password, stdin) {
        (Some(p), false) => Ok(p),
        (None, true) => {
            let mut line = String::new();
            std::io::stdin()
                .lock()
                .read_line(&mut line)
                .context("Failed to read password from stdin")?;
            Ok(line.trim_end_matches(['\r', '\n']).to_string())
        }
        (Some(_), true) => bail!("--password and --stdin are mutually exclusive"),
        (None, false) => bail!("a password is required: pass --password or --stdin"),
    }
}

/// Create an account together with its first role: `User`, or `SuperAdmin`
/// with `--admin`.
pub async fn create_user(
    config: &StaticConfig,
    email: &str,
    name: Option<String>,
    password: Option<String>,
    stdin: bool,
    admin: bool,
) -> Result<i64> {
    let password = read_password(password, stdin)?;
    if password.chars().count() < MIN_PASSWORD_LEN {
        bail!("password must be at least {} characters", MIN_PASSWORD_LEN);
    }
    let password_hash = hash_password(&password).context("Failed to hash password")?;

    let storage = StorageFactory::create(&config.database)
        .await
        .context("Failed to open storage")?;

    let display_name = name.unwrap_or_else(|| {
        email
            .split('@')
            .next()
            .unwrap_or(email)
            .to_string()
    });
    let role = if admin { SUPER_ADMIN_ROLE } else { DEFAULT_ROLE };
    let account = storage
        .create_user_with_role(
            NewUser {
                email: email.to_string(),
                password_hash,
                display_name,
                role: MIGRATED_FLAT_ROLE.to_string(),
            },
            role,
        )
        .await
        .map_err(|e| anyhow::anyhow!(e.format_simple()))?;

    info!("Created user {} <{}> in {}", account.id, account.email, role);
    println!("Created user {} <{}> in {}", account.id, account.email, role);
    Ok(account.id)
}

pub fn generate_config(output_path: Option<String>) -> Result<()> {
    let path = output_path.unwrap_or_else(|| "config.example.toml".to_string());
    StaticConfig::default()
        .save_to_file(&path)
        .map_err(|e| anyhow::anyhow!("Failed to write {}: {}", path, e))?;
    println!("Sample configuration written to {}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_sources() {
        assert_eq!(read_password(Some("secret123".into()), false).unwrap(), "secret123");
        assert!(read_password(Some("x".into()), true).is_err());
        assert!(read_password(None, false).is_err());
    }
}
