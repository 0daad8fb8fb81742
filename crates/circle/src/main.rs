//! `circle` - CLI and HTTP server for the CIRCLE order workflow
//!
//! This binary gives each actor role a command tree over the shared order
//! database, and can serve the same operations over HTTP.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use clap::Parser;

use circle::cli::output::{render_order, render_orders, render_report};
use circle::cli::{Cli, Command, ConfigCommand, OrderCommand, ServeCommand, ValidateCommand};
use circle::order::apply_assignments;
use circle::validation::as_circle_data;
use circle::{
    init_logging, CircleData, CircleValidator, Config, Error, OrderService, ReferenceData, Role,
    RuleSet,
};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone()).context("failed to load configuration")?;

    match cli.command {
        Command::Serve(cmd) => handle_serve(&config, &cmd),
        Command::Validate(cmd) => handle_validate(&config, &cmd),
        Command::Status(cmd) => handle_status(&config, cmd.json),
        Command::Config(cmd) => handle_config(&config, cmd),
        other => {
            let (role, actor, cmd) = other
                .into_role_command()
                .ok_or_else(|| anyhow!("unsupported command"))?;
            let actor_id = actor.unwrap_or_else(|| config.actors.id_for(role).to_string());
            handle_role(&config, role, &actor_id, cmd)
        }
    }
}

fn handle_serve(config: &Config, cmd: &ServeCommand) -> anyhow::Result<()> {
    let addr: SocketAddr = match &cmd.bind {
        Some(bind) => bind
            .parse()
            .with_context(|| format!("invalid bind address: {bind}"))?,
        None => config.bind_address()?,
    };

    let service = OrderService::from_config(config)?;
    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    runtime.block_on(circle::api::serve(service, addr))?;
    Ok(())
}

fn handle_role(config: &Config, role: Role, actor_id: &str, cmd: OrderCommand) -> anyhow::Result<()> {
    let service = OrderService::from_config(config)?;

    match cmd {
        OrderCommand::Create(args) => {
            let base = match &args.file {
                Some(path) => read_data_file(path)?,
                None => CircleData::new(),
            };
            let data = apply_assignments(base, &args.set)?;
            let creator = args.creator.as_deref().unwrap_or(actor_id);
            let order = with_report(service.create_order(data, creator, actor_id))?;
            println!("Created order {}", order.cle);
        }
        OrderCommand::List(args) => {
            let orders = service.inbox(role, actor_id)?;
            println!("{}", render_orders(&orders, args.format)?);
        }
        OrderCommand::Show(args) => {
            let full = service.order_with_history(&args.cle)?;
            println!("{}", render_order(&full, args.format)?);
        }
        OrderCommand::Edit(args) => {
            if !role.can_edit() {
                bail!("{role} orders are read-only");
            }
            if args.set.is_empty() && args.unset.is_empty() {
                bail!("nothing to change: use --set or --unset");
            }
            let current = service.get_order(&args.cle)?;
            let mut data = apply_assignments(current.data, &args.set)?;
            for code in &args.unset {
                data.remove(code);
            }
            let order = with_report(service.update_order(&args.cle, data, actor_id))?;
            println!("Updated order {}", order.cle);
        }
        OrderCommand::Transition {
            action,
            cle,
            to,
            reason,
        } => {
            let order = service.transition(&cle, action, actor_id, &to, reason.as_deref())?;
            println!(
                "Order {} is now {}, held by {}",
                order.cle, order.status, order.current_holder
            );
        }
    }
    Ok(())
}

fn handle_validate(config: &Config, cmd: &ValidateCommand) -> anyhow::Result<()> {
    let data = read_data_file(&cmd.file)?;
    let rules = RuleSet::load(&config.rules_path())?;
    let reference = ReferenceData::load(&config.reference_dir())?;
    let report = CircleValidator::new(rules, Arc::new(reference)).validate(&data);

    if cmd.json {
        let out = serde_json::json!({
            "valid": report.is_empty(),
            "errors": report,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("{}", render_report(&report));
    }

    if report.is_empty() {
        Ok(())
    } else {
        bail!("{} field(s) failed validation", report.len())
    }
}

fn handle_status(config: &Config, json: bool) -> anyhow::Result<()> {
    let service = OrderService::from_config(config)?;
    let stats = service.stats()?;
    let rule_fields = service.validator().rules().len();

    if json {
        let status = serde_json::json!({
            "database_path": config.database_path(),
            "rules_path": config.rules_path(),
            "reference_dir": config.reference_dir(),
            "rule_fields": rule_fields,
            "stats": stats,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("circle status");
        println!("-------------");
        println!("Database:      {}", config.database_path().display());
        println!("Rules:         {} ({rule_fields} fields)", config.rules_path().display());
        println!("Reference:     {}", config.reference_dir().display());
        println!("Orders:        {}", stats.total_orders);
        for (status, count) in &stats.by_status {
            println!("  {status:<26} {count}");
        }
        println!("History:       {} entries", stats.history_entries);
        if let Some(last) = stats.last_change {
            println!("Last change:   {}", last.format("%Y-%m-%d %H:%M:%S UTC"));
        }
        println!("Size:          {} bytes", stats.db_size_bytes);
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:   {}", config.database_path().display());
                println!();
                println!("[Rules]");
                println!("  Rule file:       {}", config.rules_path().display());
                println!("  Reference dir:   {}", config.reference_dir().display());
                println!();
                println!("[Server]");
                println!("  Bind address:    {}", config.server.bind_address);
                println!();
                println!("[Actors]");
                for role in Role::ALL {
                    println!("  {:<16} {}", format!("{role}:"), config.actors.id_for(role));
                }
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => bail!("configuration error: {e}"),
            }
        }
    }
    Ok(())
}

/// Read a JSON object of CIRCLE fields from a file.
fn read_data_file(path: &Path) -> anyhow::Result<CircleData> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&contents)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;
    as_circle_data(value).ok_or_else(|| anyhow!("{} must hold a JSON object", path.display()))
}

/// Print the field errors of a failed validation before returning it.
fn with_report<T>(result: circle::Result<T>) -> anyhow::Result<T> {
    result.map_err(|err| {
        if let Error::Validation(report) = &err {
            eprintln!("{}", render_report(report));
        }
        err.into()
    })
}
