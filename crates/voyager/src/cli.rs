//! Clap derive structures for the `voyager` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use voyager_api::billing::{PaymentPlatform, ProductType};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// voyager -- talk to the Voyager backends from a terminal
#[derive(Debug, Parser)]
#[command(
    name = "voyager",
    version,
    about = "Command-line client for the Voyager auth, chat, and billing services",
    long_about = "Sign in, stream chat replies, and inspect VIP status against\n\
        the Voyager backends. Transient network failures are retried\n\
        automatically; business errors are reported as-is.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "VOYAGER_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Account to act as (overrides the config file)
    #[arg(long, short = 'a', global = true)]
    pub account: Option<String>,

    /// Output format
    #[arg(long, short = 'o', default_value = "plain", global = true)]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', global = true)]
    pub insecure: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable key/value lines
    Plain,
    /// Pretty-printed JSON
    Json,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in and remember the session token
    Login,

    /// Invalidate the current session token
    Logout,

    /// Exchange the current token for a fresh one
    Refresh,

    /// Show a user's profile
    #[command(alias = "whoami")]
    UserInfo {
        /// Numeric user id
        user_id: i64,
    },

    /// Chat sessions and messages
    Chat(ChatArgs),

    /// VIP membership, quotas, and products
    Vip(VipArgs),

    /// Probe every backend's health endpoint
    Health,

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Chat ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ChatArgs {
    #[command(subcommand)]
    pub command: ChatCommand,
}

#[derive(Debug, Subcommand)]
pub enum ChatCommand {
    /// Send a message and stream the reply to stdout
    Send {
        /// Session to post into
        session_id: String,
        /// Message text
        content: String,
    },

    /// Create a new chat session
    New {
        #[arg(long)]
        user_id: i64,
        #[arg(long)]
        name: String,
        #[arg(long)]
        role_id: String,
        #[arg(long)]
        bot_id: String,
    },

    /// List a user's sessions
    Sessions {
        user_id: i64,
        #[arg(long, default_value = "1")]
        page: u32,
        #[arg(long, default_value = "20")]
        page_size: u32,
    },

    /// Show messages in a session
    History {
        session_id: String,
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        page_size: Option<u32>,
    },
}

// ── VIP ──────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct VipArgs {
    #[command(subcommand)]
    pub command: VipCommand,
}

#[derive(Debug, Subcommand)]
pub enum VipCommand {
    /// Membership level and expiry
    Info,

    /// Whether membership is currently active
    Status,

    /// Daily usage quota
    Quota,

    /// List purchasable products
    Products {
        #[arg(long, default_value = "apple", value_parser = parse_platform)]
        platform: PaymentPlatform,
        #[arg(long = "type", value_parser = parse_product_type)]
        product_type: Option<ProductType>,
        #[arg(long)]
        featured: Option<bool>,
    },
}

fn parse_platform(s: &str) -> Result<PaymentPlatform, String> {
    s.parse().map_err(|_| format!("unknown platform '{s}' (expected apple or google)"))
}

fn parse_product_type(s: &str) -> Result<ProductType, String> {
    s.parse().map_err(|_| format!("unknown product type '{s}'"))
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file location
    Path,

    /// Display current resolved configuration
    Show,

    /// Write a config file with default endpoints
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
