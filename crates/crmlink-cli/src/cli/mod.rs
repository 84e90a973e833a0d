//! CLI for the crmlink webhook access layer.

mod commands;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use crmlink_core::{config, ApiClient, ClientConfig};

use commands::{run_call, run_completions, run_list, run_man, run_products};

/// Top-level CLI for crmlink.
#[derive(Debug, Parser)]
#[command(name = "crmlink")]
#[command(about = "crmlink: rate-limited, retrying CRM webhook client", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Call one API method and print its result.
    Call {
        /// Method name, e.g. crm.deal.get.
        method: String,
        /// Parameter as key=value; values that parse as JSON are sent as JSON.
        #[arg(short = 'p', long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,
        /// Send as GET with a query string instead of a JSON POST.
        #[arg(long)]
        get: bool,
    },

    /// Fetch every page of a list method and print all items.
    List {
        /// List method name, e.g. crm.item.list.
        method: String,
        /// Filter condition as key=value.
        #[arg(short = 'f', long = "filter", value_name = "KEY=VALUE")]
        filters: Vec<String>,
        /// Field to select (repeatable).
        #[arg(long = "select", value_name = "FIELD")]
        select: Vec<String>,
        /// Rows per page; the server default when omitted.
        #[arg(long, value_name = "N")]
        page_size: Option<u32>,
    },

    /// Show the product rows of one or more invoices.
    Products {
        /// Invoice identifiers.
        #[arg(required = true)]
        ids: Vec<u64>,
        /// Look up with N threads (one call per invoice) instead of batching.
        #[arg(long, default_value = "1", value_name = "N")]
        workers: usize,
    },

    /// Print shell completions to stdout.
    Completions {
        shell: Shell,
    },

    /// Print the man page to stdout.
    Man,
}

impl CliCommand {
    pub fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        match cli.command {
            CliCommand::Completions { shell } => run_completions(shell),
            CliCommand::Man => run_man(),
            CliCommand::Call { method, params, get } => {
                run_call(&open_client()?, &method, &params, get)
            }
            CliCommand::List {
                method,
                filters,
                select,
                page_size,
            } => run_list(&open_client()?, &method, &filters, &select, page_size),
            CliCommand::Products { ids, workers } => run_products(&open_client()?, &ids, workers),
        }
    }
}

fn open_client() -> Result<ApiClient> {
    let cfg = config::load_or_init()?;
    tracing::debug!(
        rps = cfg.max_requests_per_second,
        timeout_secs = cfg.timeout_secs,
        "loaded config"
    );
    if cfg.webhook_url.trim().is_empty() {
        bail!(
            "no webhook URL configured; set webhook_url in {} or {}",
            config::config_path()?.display(),
            config::WEBHOOK_URL_ENV
        );
    }
    Ok(ApiClient::new(ClientConfig::from_config(&cfg))?)
}

#[cfg(test)]
mod tests;
