//! Command-line interface definitions using clap

use clap::{Parser, Subcommand};

use crate::config::DEFAULT_CONFIG_PATH;

/// biolinker - link-in-bio platform core
#[derive(Parser, Debug)]
#[command(name = "biolinker")]
#[command(version)]
#[command(about = "RBAC and visitor analytics core for a link-in-bio platform", long_about = None)]
pub struct Cli {
    /// Configuration file
    #[arg(long, short = 'c', global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP server (default)
    Serve,

    /// Create an account
    CreateUser {
        email: String,

        /// Display name (defaults to the email's local part)
        #[arg(long)]
        name: Option<String>,

        /// Password (visible in shell history; prefer --stdin)
        #[arg(long)]
        password: Option<String>,

        /// Read the password from stdin
        #[arg(long)]
        stdin: bool,

        /// Grant SuperAdmin instead of User
        #[arg(long)]
        admin: bool,
    },

    /// Write a sample configuration file
    GenerateConfig {
        /// Output path (default: config.example.toml)
        output_path: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_no_subcommand() {
        let cli = Cli::parse_from(["biolinker"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.config, DEFAULT_CONFIG_PATH);
    }

    #[test]
    fn create_user_flags() {
        let cli = Cli::parse_from([
            "biolinker",
            "--config",
            "/etc/bl.toml",
            "create-user",
            "ada@example.com",
            "--stdin",
            "--admin",
        ]);
        assert_eq!(cli.config, "/etc/bl.toml");
        match cli.command {
            Some(Commands::CreateUser {
                email,
                stdin,
                admin,
                password,
                ..
            }) => {
                assert_eq!(email, "ada@example.com");
                assert!(stdin && admin);
                assert!(password.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
