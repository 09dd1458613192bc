//! CLI module - Command-line interface for mama
//!
//! This module provides a structured CLI using clap for argument parsing.

mod commands;

use clap::{Parser, Subcommand};

/// mama - LiteLLM key administration backend
#[derive(Parser)]
#[command(name = "mama")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API server (default)
    #[command(alias = "daemon")]
    Serve,

    /// Create default config file
    Init,

    /// Create an admin account (password from MAMA_ADMIN_PASSWORD or stdin)
    CreateAdmin {
        /// Admin username
        username: String,
        /// Grant superadmin rights
        #[arg(long)]
        super_admin: bool,
    },

    /// Reset an admin's password (password from MAMA_ADMIN_PASSWORD or stdin)
    SetPassword {
        /// Admin username
        username: String,
    },
}

pub use commands::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_is_the_default() {
        let cli = Cli::try_parse_from(["mama"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn create_admin_flags() {
        let cli = Cli::try_parse_from(["mama", "create-admin", "root", "--super-admin"]).unwrap();
        match cli.command {
            Some(Commands::CreateAdmin {
                username,
                super_admin,
            }) => {
                assert_eq!(username, "root");
                assert!(super_admin);
            }
            _ => panic!("expected create-admin"),
        }
    }
}
