use std::env;
use std::io::{self, Read};

mod commands;
use duckconn_engine::{execute_args_with, execute_command_with};
use duckconn_lib::{init_tracing, AppConfig, AppResult};

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run() -> AppResult<()> {
    let config = AppConfig::from_env()?;
    let _guard = init_tracing(&config)?;

    let args = env::args().skip(1).collect::<Vec<String>>();
    if args.is_empty() {
        let mut input = String::new();
        io::stdin().read_to_string(&mut input)?;
        if input.trim().is_empty() {
            commands::help::print_help();
            return Ok(());
        }
        let output = execute_command_with(input.trim(), &config.options)?;
        println!("{output}");
        return Ok(());
    }

    if commands::help::is_help_request(&args) {
        commands::help::print_help();
        return Ok(());
    }

    if !matches!(args[0].as_str(), "query" | "schema" | "demo") {
        commands::help::print_help();
        return Ok(());
    }

    let output = execute_args_with(&args, &config.options)?;
    println!("{output}");

    Ok(())
}
