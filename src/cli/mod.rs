mod serve;
mod setup;

use anyhow::Result;
use console::style;

use crate::core::terminal::{self, GuideSection, print_error};

fn print_help() {
    terminal::print_banner();

    GuideSection::new("Core")
        .command("serve", "Start the HTTP API (default 127.0.0.1:17990)")
        .print();

    GuideSection::new("Setup")
        .command("init", "Write the default config.toml to the data directory")
        .command(
            "token create",
            "Mint an API token: --owner <id> [--name <label>]",
        )
        .print();

    println!(
        "\n {} {} <command> [options]\n",
        style("Usage:").bold(),
        style("pmcouncil").green()
    );
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    Serve {
        api_host: Option<String>,
        api_port: Option<u16>,
    },
    Init,
    TokenCreate {
        owner: String,
        name: String,
    },
    Help,
    Unknown(String),
}

/// Value following `flag`, if both are present.
fn flag_value(args: &[String], start: usize, flags: &[&str]) -> Option<String> {
    let mut i = start;
    while i < args.len() {
        if flags.contains(&args[i].as_str()) {
            return args.get(i + 1).cloned();
        }
        i += 1;
    }
    None
}

pub(crate) fn parse_api_server_flags(args: &[String], start: usize) -> (Option<String>, Option<u16>) {
    let api_host = flag_value(args, start, &["--api-host"]);
    let api_port = flag_value(args, start, &["--api-port"]).and_then(|p| p.parse().ok());
    (api_host, api_port)
}

/// `args` includes the program name at index 0.
pub(crate) fn parse_command(args: &[String]) -> Command {
    let Some(cmd) = args.get(1) else {
        return Command::Help;
    };
    match cmd.as_str() {
        "serve" => {
            let (api_host, api_port) = parse_api_server_flags(args, 2);
            Command::Serve { api_host, api_port }
        }
        "init" => Command::Init,
        "token" => match args.get(2).map(String::as_str) {
            Some("create") => Command::TokenCreate {
                owner: flag_value(args, 3, &["--owner", "-o"]).unwrap_or_default(),
                name: flag_value(args, 3, &["--name", "-n"]).unwrap_or_else(|| "cli".to_string()),
            },
            _ => Command::Unknown("token".to_string()),
        },
        "help" | "--help" | "-h" => Command::Help,
        other => Command::Unknown(other.to_string()),
    }
}

pub async fn run_main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    match parse_command(&args) {
        Command::Serve { api_host, api_port } => serve::run_serve(api_host, api_port).await,
        Command::Init => setup::run_init().await,
        Command::TokenCreate { owner, name } => setup::run_token_create(&owner, &name).await,
        Command::Help => {
            print_help();
            Ok(())
        }
        Command::Unknown(cmd) => {
            print_error(&format!("Unknown command: {}", cmd));
            print_help();
            std::process::exit(2);
        }
    }
}
