// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod demo;
mod logging;
mod runtime;

use anyhow::{Context, Result};
use config::Config;
use dongbu_app::AppState;
use dongbu_remote::{Client, SessionHandle};
use runtime::{MemoryRuntime, RemoteRuntime};
use std::env;
use std::path::PathBuf;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
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
            "load config {}; run `dongbu --print-example-config` to generate a template",
            options.config_path.display()
        )
    })?;

    let log_path = config.log_path()?;
    if options.print_log_path {
        println!("{}", log_path.display());
        return Ok(());
    }
    logging::init(&log_path, &config.log_filter())?;

    let cars = config.car_numbers();
    let mut state = AppState::with_tab(config.start_tab());

    if options.demo {
        let store = demo::seed_demo_store(&cars)?;
        if options.check_only {
            return Ok(());
        }
        let mut runtime = MemoryRuntime::new(store);
        return dongbu_tui::run_app(&mut state, &mut runtime, cars);
    }

    let remote = config.remote_settings().with_context(|| {
        format!(
            "invalid [remote] config in {}; or run `dongbu --demo` to try it offline",
            options.config_path.display()
        )
    })?;
    let client = Client::new(&remote.url, &remote.api_key, remote.timeout, SessionHandle::new())
        .with_context(|| {
            format!(
                "invalid [remote] config in {}; fix url/api_key/timeout values",
                options.config_path.display()
            )
        })?;
    tracing::info!(url = client.base_url(), "starting");

    if options.check_only {
        client
            .ping()
            .with_context(|| format!("reach {}", client.base_url()))?;
        return Ok(());
    }

    let mut runtime = RemoteRuntime::new(&client);
    dongbu_tui::run_app(&mut state, &mut runtime, cars)
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    print_log_path: bool,
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
        print_log_path: false,
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
            "--print-log-path" => {
                options.print_log_path = true;
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
    println!("dongbu: shared board, storage inventory, and car logbook");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a config template");
    println!("  --print-log-path         Print resolved log file path");
    println!("  --demo                   Run against seeded in-memory tables");
    println!("  --check                  Validate config and reach the remote service");
    println!("  --help                   Show this help");
}
