// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod runtime;

use anyhow::{Context, Result};
use config::Config;
use procura_api::Client;
use procura_app::AppState;
use procura_store::Store;
use runtime::{ApiRuntime, DemoRuntime};
use std::env;
use std::path::PathBuf;

fn main() {
    if let Err(error) = run() {
        eprintln!("error: {error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `procura --print-example-config` to generate a template",
            options.config_path.display()
        )
    })?;

    let db_path = if options.demo {
        PathBuf::from(":memory:")
    } else {
        config.db_path()?
    };
    if options.print_db_path {
        println!("{}", db_path.display());
        return Ok(());
    }

    let store = Store::open(&db_path).with_context(|| {
        format!(
            "open database {} -- if this path is wrong, set [storage].db_path or PROCURA_DB_PATH",
            db_path.display()
        )
    })?;
    store.bootstrap()?;

    let client = if options.demo {
        None
    } else {
        Some(
            Client::new(config.api_base_url()?, config.api_timeout()?).with_context(|| {
                format!(
                    "invalid [api] config in {}; fix base_url/timeout values",
                    options.config_path.display()
                )
            })?,
        )
    };

    if options.check_only {
        println!("config   {}", options.config_path.display());
        println!("database {}", db_path.display());
        match &client {
            Some(client) => println!(
                "api      {} (timeout {:?})",
                client.base_url(),
                client.timeout()
            ),
            None => println!("api      demo mode, no server needed"),
        }
        return Ok(());
    }

    // Saved preferences win over config defaults once the user has
    // changed them in the UI.
    let page_size = store.load_page_size()?.unwrap_or_else(|| config.page_size());
    let show_deleted = store
        .load_show_deleted()?
        .unwrap_or_else(|| config.show_deleted());

    let mut state = AppState::default();
    match client {
        Some(client) => {
            let mut runtime = ApiRuntime::new(client, store, page_size, show_deleted);
            procura_tui::run_app(&mut state, &mut runtime)
        }
        None => {
            let mut runtime = DemoRuntime::new(store, page_size, show_deleted);
            procura_tui::run_app(&mut state, &mut runtime)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    print_db_path: bool,
    demo: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        print_config_path: false,
        print_db_path: false,
        demo: false,
        print_example: false,
        check_only: false,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-db-path" => {
                options.print_db_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--demo" => {
                options.demo = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow::anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("procura");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-db-path          Print resolved database path");
    println!("  --print-example-config   Print a config template");
    println!("  --demo                   Launch with deterministic demo data (in-memory, no server)");
    println!("  --check                  Validate config, database, and API client without starting the UI");
    println!("  --help                   Show this help");
}
