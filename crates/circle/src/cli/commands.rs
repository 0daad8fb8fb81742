//! CLI command definitions.
//!
//! Each actor role gets its own subcommand tree with only the actions that
//! role can take. They all reduce to an [`OrderCommand`].

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::workflow::Action;

/// Serve command arguments.
#[derive(Debug, Args)]
pub struct ServeCommand {
    /// Address to listen on (overrides `server.bind_address`)
    #[arg(short, long, value_name = "ADDR")]
    pub bind: Option<String>,
}

/// Arguments shared by every role subcommand.
#[derive(Debug, Args)]
pub struct ActorArgs {
    /// Act as this ID instead of the configured default
    #[arg(long = "as", value_name = "ID", global = true)]
    pub actor: Option<String>,
}

/// Broker commands.
#[derive(Debug, Subcommand)]
pub enum BrokerCommand {
    /// Create a new draft order
    Create(CreateArgs),
    /// List your orders
    List(ListArgs),
    /// Show one order with its history
    Show(ShowArgs),
    /// Amend an order you hold
    Edit(EditArgs),
    /// Send a draft to a castle
    SendToCastle(SendArgs),
}

/// Castle commands.
#[derive(Debug, Subcommand)]
pub enum CastleCommand {
    /// List orders awaiting your review
    List(ListArgs),
    /// Show one order with its history
    Show(ShowArgs),
    /// Amend an order you hold
    Edit(EditArgs),
    /// Forward an order to a merchant
    SendToMerchant(SendArgs),
    /// Send an order back to the broker
    ReturnToBroker(SendArgs),
}

/// Merchant commands.
#[derive(Debug, Subcommand)]
pub enum MerchantCommand {
    /// List orders awaiting your approval
    List(ListArgs),
    /// Show one order with its history
    Show(ShowArgs),
    /// Amend an order you hold
    Edit(EditArgs),
    /// Approve an order and hand it to a warehouse
    Approve(SendArgs),
    /// Send an order back to the castle
    ReturnToCastle(ReturnArgs),
}

/// Warehouse commands.
#[derive(Debug, Subcommand)]
pub enum WarehouseCommand {
    /// List approved orders assigned to you
    List(ListArgs),
    /// Show one order with its history
    Show(ShowArgs),
}

/// Create command arguments.
#[derive(Debug, Args)]
pub struct CreateArgs {
    /// Set a field, e.g. `--set C10=1111A0` (values are read as JSON when possible)
    #[arg(short, long = "set", value_name = "CODE=VALUE")]
    pub set: Vec<String>,

    /// Read initial fields from a JSON object file
    #[arg(short, long, value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Creator ID (defaults to the acting broker)
    #[arg(long, value_name = "ID")]
    pub creator: Option<String>,
}

/// List command arguments.
#[derive(Debug, Args)]
pub struct ListArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

/// Show command arguments.
#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Order key
    pub cle: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,
}

/// Edit command arguments.
#[derive(Debug, Args)]
pub struct EditArgs {
    /// Order key
    pub cle: String,

    /// Set a field, e.g. `--set C40=600`
    #[arg(short, long = "set", value_name = "CODE=VALUE")]
    pub set: Vec<String>,

    /// Remove a field
    #[arg(long, value_name = "CODE")]
    pub unset: Vec<String>,
}

/// Arguments of a hand-over action.
#[derive(Debug, Args)]
pub struct SendArgs {
    /// Order key
    pub cle: String,

    /// ID of the party receiving the order
    #[arg(long, value_name = "ID")]
    pub to: String,
}

/// Arguments of `return-to-castle`.
#[derive(Debug, Args)]
pub struct ReturnArgs {
    /// Order key
    pub cle: String,

    /// ID of the castle receiving the order
    #[arg(long, value_name = "ID")]
    pub to: String,

    /// Why the order is sent back
    #[arg(long)]
    pub reason: String,
}

/// Validate command arguments.
#[derive(Debug, Args)]
pub struct ValidateCommand {
    /// JSON file holding the order fields
    pub file: PathBuf,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Plain,
    /// Formatted table
    Table,
    /// JSON output
    Json,
}

/// A role command reduced to the operation it performs.
#[derive(Debug)]
pub enum OrderCommand {
    /// Create a draft.
    Create(CreateArgs),
    /// List the role's inbox.
    List(ListArgs),
    /// Show one order.
    Show(ShowArgs),
    /// Amend an order.
    Edit(EditArgs),
    /// Apply a workflow action.
    Transition {
        /// The action.
        action: Action,
        /// Order key.
        cle: String,
        /// Receiving party.
        to: String,
        /// Reason, for actions that need one.
        reason: Option<String>,
    },
}

impl OrderCommand {
    fn transition(action: Action, args: SendArgs) -> Self {
        Self::Transition {
            action,
            cle: args.cle,
            to: args.to,
            reason: None,
        }
    }
}

impl From<BrokerCommand> for OrderCommand {
    fn from(cmd: BrokerCommand) -> Self {
        match cmd {
            BrokerCommand::Create(args) => Self::Create(args),
            BrokerCommand::List(args) => Self::List(args),
            BrokerCommand::Show(args) => Self::Show(args),
            BrokerCommand::Edit(args) => Self::Edit(args),
            BrokerCommand::SendToCastle(args) => Self::transition(Action::SendToCastle, args),
        }
    }
}

impl From<CastleCommand> for OrderCommand {
    fn from(cmd: CastleCommand) -> Self {
        match cmd {
            CastleCommand::List(args) => Self::List(args),
            CastleCommand::Show(args) => Self::Show(args),
            CastleCommand::Edit(args) => Self::Edit(args),
            CastleCommand::SendToMerchant(args) => Self::transition(Action::SendToMerchant, args),
            CastleCommand::ReturnToBroker(args) => Self::transition(Action::ReturnToBroker, args),
        }
    }
}

impl From<MerchantCommand> for OrderCommand {
    fn from(cmd: MerchantCommand) -> Self {
        match cmd {
            MerchantCommand::List(args) => Self::List(args),
            MerchantCommand::Show(args) => Self::Show(args),
            MerchantCommand::Edit(args) => Self::Edit(args),
            MerchantCommand::Approve(args) => Self::transition(Action::Approve, args),
            MerchantCommand::ReturnToCastle(args) => Self::Transition {
                action: Action::ReturnToCastle,
                cle: args.cle,
                to: args.to,
                reason: Some(args.reason),
            },
        }
    }
}

impl From<WarehouseCommand> for OrderCommand {
    fn from(cmd: WarehouseCommand) -> Self {
        match cmd {
            WarehouseCommand::List(args) => Self::List(args),
            WarehouseCommand::Show(args) => Self::Show(args),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn send(cle: &str) -> SendArgs {
        SendArgs {
            cle: cle.to_string(),
            to: "next".to_string(),
        }
    }

    #[test]
    fn test_output_format_default() {
        assert_eq!(OutputFormat::default(), OutputFormat::Plain);
    }

    #[test]
    fn test_broker_send_becomes_transition() {
        let cmd = OrderCommand::from(BrokerCommand::SendToCastle(send("CLE-1")));
        assert!(matches!(
            cmd,
            OrderCommand::Transition {
                action: Action::SendToCastle,
                reason: None,
                ..
            }
        ));
    }

    #[test]
    fn test_castle_actions() {
        assert!(matches!(
            OrderCommand::from(CastleCommand::SendToMerchant(send("CLE-1"))),
            OrderCommand::Transition {
                action: Action::SendToMerchant,
                ..
            }
        ));
        assert!(matches!(
            OrderCommand::from(CastleCommand::ReturnToBroker(send("CLE-1"))),
            OrderCommand::Transition {
                action: Action::ReturnToBroker,
                ..
            }
        ));
    }

    #[test]
    fn test_merchant_return_keeps_reason() {
        let cmd = OrderCommand::from(MerchantCommand::ReturnToCastle(ReturnArgs {
            cle: "CLE-1".to_string(),
            to: "castle_x".to_string(),
            reason: "wrong vintage".to_string(),
        }));
        match cmd {
            OrderCommand::Transition { action, reason, .. } => {
                assert_eq!(action, Action::ReturnToCastle);
                assert_eq!(reason.as_deref(), Some("wrong vintage"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_warehouse_show() {
        let cmd = OrderCommand::from(WarehouseCommand::Show(ShowArgs {
            cle: "CLE-1".to_string(),
            format: OutputFormat::Json,
        }));
        assert!(matches!(cmd, OrderCommand::Show(ShowArgs { format: OutputFormat::Json, .. })));
    }

    #[test]
    fn test_config_command_debug() {
        let cmd = ConfigCommand::Show { json: false };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("Show"));
    }
}
