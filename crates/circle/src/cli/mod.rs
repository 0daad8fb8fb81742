//! Command-line interface for circle.
//!
//! This module provides the CLI structure for the `circle` binary: one
//! subcommand tree per actor role, plus the HTTP server and maintenance
//! commands.

mod commands;
pub mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ActorArgs, BrokerCommand, CastleCommand, ConfigCommand, CreateArgs, EditArgs, ListArgs,
    MerchantCommand, OrderCommand, OutputFormat, ReturnArgs, SendArgs, ServeCommand, ShowArgs,
    StatusCommand, ValidateCommand, WarehouseCommand,
};

use crate::logging::Verbosity;
use crate::workflow::Role;

/// circle - Wine order workflow between brokers, castles, merchants and warehouses
///
/// Orders are created by brokers, reviewed by castles, approved by merchants
/// and picked up by warehouses. Every change is checked against the CIRCLE
/// rule file.
#[derive(Debug, Parser)]
#[command(name = "circle")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP API
    Serve(ServeCommand),

    /// Create drafts and send them to a castle
    Broker {
        #[command(flatten)]
        actor: ActorArgs,
        #[command(subcommand)]
        command: BrokerCommand,
    },

    /// Review orders and forward them to a merchant
    Castle {
        #[command(flatten)]
        actor: ActorArgs,
        #[command(subcommand)]
        command: CastleCommand,
    },

    /// Approve orders or send them back
    Merchant {
        #[command(flatten)]
        actor: ActorArgs,
        #[command(subcommand)]
        command: MerchantCommand,
    },

    /// View approved orders
    Warehouse {
        #[command(flatten)]
        actor: ActorArgs,
        #[command(subcommand)]
        command: WarehouseCommand,
    },

    /// Check a JSON order payload against the rules
    Validate(ValidateCommand),

    /// Show database and rule status
    Status(StatusCommand),

    /// View configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Command {
    /// Split a role subcommand into its role, `--as` override and operation.
    #[must_use]
    pub fn into_role_command(self) -> Option<(Role, Option<String>, OrderCommand)> {
        match self {
            Self::Broker { actor, command } => Some((Role::Broker, actor.actor, command.into())),
            Self::Castle { actor, command } => Some((Role::Castle, actor.actor, command.into())),
            Self::Merchant { actor, command } => {
                Some((Role::Merchant, actor.actor, command.into()))
            }
            Self::Warehouse { actor, command } => {
                Some((Role::Warehouse, actor.actor, command.into()))
            }
            _ => None,
        }
    }
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::Trace,
            }
        }
    }
}
