pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "teamdraw",
    about = "Teamdraw operator CLI",
    long_about = "Inspect teamdraw configuration and readiness, and run team splits or picks from the terminal.",
    after_help = "Examples:\n  teamdraw doctor --json\n  teamdraw teams --size 3 ana ben cho dev eli\n  teamdraw pick --count 2 --exclude ben ana ben cho"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, Slack token readiness, and member directory settings")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Split items into teams of a fixed size plus a leftover group")]
    Teams {
        #[arg(
            long,
            default_value_t = 3,
            allow_negative_numbers = true,
            help = "Team size; 0 or less keeps everyone in one team"
        )]
        size: i64,
        #[arg(long, help = "Seed for a reproducible draw")]
        seed: Option<u64>,
        #[arg(required = true, help = "Items to split")]
        items: Vec<String>,
    },
    #[command(about = "Pick distinct items at random")]
    Pick {
        #[arg(
            long,
            default_value_t = 1,
            allow_negative_numbers = true,
            help = "How many items to pick"
        )]
        count: i64,
        #[arg(long, help = "Seed for a reproducible draw")]
        seed: Option<u64>,
        #[arg(long = "exclude", help = "Item to leave out of the draw (repeatable)")]
        excluded: Vec<String>,
        #[arg(required = true, help = "Items to pick from")]
        items: Vec<String>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => commands::config::run(),
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Teams { size, seed, items } => {
            commands::draw::teams(commands::draw::TeamsArgs { size, seed, items })
        }
        Command::Pick { count, seed, excluded, items } => {
            commands::draw::pick(commands::draw::PickArgs { count, seed, excluded, items })
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
