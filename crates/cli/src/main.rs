use anyhow::Result;
use clap::{Parser, Subcommand};
use sift_storage::RuleStore;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod output;

use commands::{RowEdit, Session};
use sift_import::Learned;

#[derive(Parser, Debug)]
#[command(name = "sift", version, about = "Sort bank statement transactions into your own categories")]
struct Cli {
    /// Rule file (category → keywords JSON); overrides the config file
    #[arg(long, global = true)]
    rules: Option<PathBuf>,

    /// Config file (TOML); defaults to config.toml in the data directory
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load a statement CSV, categorize it and show debits plus the summary
    Import {
        csv: PathBuf,

        /// Print the categorized records and report as JSON
        #[arg(long)]
        json: bool,

        /// Also list credit rows
        #[arg(long)]
        all: bool,
    },

    /// Only print the spending summary of a statement
    Summary {
        csv: PathBuf,

        #[arg(long)]
        json: bool,
    },

    /// Manage categories
    Categories {
        #[command(subcommand)]
        command: CategoriesCommand,
    },

    /// Manage keyword rules
    Keywords {
        #[command(subcommand)]
        command: KeywordsCommand,
    },

    /// Move debit rows to another category and learn their details as keywords
    Recategorize {
        csv: PathBuf,

        /// ROW=CATEGORY, with ROW as numbered by `import` (repeatable)
        #[arg(long = "set", value_name = "ROW=CATEGORY", value_parser = commands::parse_row_edit, required = true)]
        changes: Vec<RowEdit>,
    },
}

#[derive(Subcommand, Debug)]
enum CategoriesCommand {
    /// List categories with their keywords
    List,
    /// Add an empty category
    Add { name: String },
}

#[derive(Subcommand, Debug)]
enum KeywordsCommand {
    /// Add a keyword to an existing category
    Add { category: String, keyword: String },
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let data_dir = config::data_dir();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| data_dir.join(config::CONFIG_FILE));
    let cfg = config::load_config(&config_path)?;

    let rules_path = cli.rules.clone().unwrap_or_else(|| cfg.rules_path(&data_dir));
    tracing::debug!("Using rules at {}", rules_path.display());
    let store = RuleStore::open_or_default(rules_path);

    let currency = cfg.currency.as_deref();
    let mut session = Session::new(store, cfg.format.clone());

    match cli.command {
        Command::Import { csv, json, all } => {
            let view = commands::import_statement(&session, &csv)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                print!("{}", output::render_rows("Expenses (debits)", &view.debits, currency));
                if all {
                    println!();
                    print!("{}", output::render_rows("Payments (credits)", &view.credits, currency));
                }
                println!();
                print!("{}", output::render_report(&view.report, currency));
            }
        }

        Command::Summary { csv, json } => {
            let view = commands::import_statement(&session, &csv)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&view.report)?);
            } else {
                print!("{}", output::render_report(&view.report, currency));
            }
        }

        Command::Categories { command } => match command {
            CategoriesCommand::List => {
                print!("{}", output::render_categories(&commands::list_categories(&session)));
            }
            CategoriesCommand::Add { name } => {
                commands::add_category(&mut session, &name)?;
                println!("Category '{}' added.", name.trim());
            }
        },

        Command::Keywords { command } => match command {
            KeywordsCommand::Add { category, keyword } => {
                if commands::add_keyword(&mut session, &category, &keyword)? {
                    println!("Keyword '{}' added to category '{category}'.", keyword.trim());
                } else {
                    println!("No change: the keyword is blank or '{category}' already has it.");
                }
            }
        },

        Command::Recategorize { csv, changes } => {
            let (outcomes, view) = commands::recategorize(&mut session, &csv, &changes)?;
            for (change, outcome) in changes.iter().zip(&outcomes) {
                match outcome {
                    Learned::Unchanged => {
                        println!("Row {}: already in '{}'", change.row, change.category);
                    }
                    Learned::Recategorized { from, to, keyword_added } => {
                        let note = if *keyword_added { "keyword learned" } else { "no new keyword" };
                        println!("Row {}: {from} -> {to} ({note})", change.row);
                    }
                }
            }
            println!();
            print!("{}", output::render_report(&view.report, currency));
        }
    }

    Ok(())
}
