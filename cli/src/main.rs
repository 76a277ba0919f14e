mod commands;
mod util;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::bench::BenchArgs;
use commands::catalog::PatternsArgs;
use commands::classify::ClassifyArgs;
use commands::rules::RulesCommands;

#[derive(Parser)]
#[command(
    name = "kotaro",
    version,
    about = "Kotaro CLI: turn vision-oracle scores and flags into persona patterns"
)]
struct Cli {
    /// Rule set JSON file (defaults to ~/.config/kotaro/rules.json, then the built-in set)
    #[arg(long, env = "KOTARO_RULES", global = true)]
    rules: Option<PathBuf>,

    /// How to treat flag keys outside the vocabulary
    #[arg(
        long,
        env = "KOTARO_FLAG_POLICY",
        default_value = "strict",
        value_parser = ["strict", "lenient"],
        global = true
    )]
    flag_policy: String,

    /// Log output format (logs go to stderr)
    #[arg(
        long,
        env = "KOTARO_LOG_FORMAT",
        default_value = "pretty",
        value_parser = ["pretty", "json"],
        global = true
    )]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify one oracle answer
    Classify(ClassifyArgs),
    /// Classify a JSON Lines batch and report the pattern distribution
    Bench(BenchArgs),
    /// List the pattern catalog
    Patterns(PatternsArgs),
    /// Inspect or validate rule sets
    Rules {
        #[command(subcommand)]
        command: RulesCommands,
    },
    /// Print the JSON schema of the CLI's wire types
    Schema,
}

fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    util::init_tracing(&cli.log_format);

    let policy = util::flag_policy(&cli.flag_policy);
    let code = match cli.command {
        Commands::Classify(args) => {
            let engine = util::build_engine(cli.rules.as_deref());
            commands::classify::run(&engine, policy, args)
        }
        Commands::Bench(args) => {
            let engine = util::build_engine(cli.rules.as_deref());
            commands::bench::run(&engine, policy, args)
        }
        Commands::Patterns(args) => commands::catalog::run(args),
        Commands::Rules { command } => commands::rules::run(cli.rules.as_deref(), command),
        Commands::Schema => commands::schema::run(),
    };

    std::process::exit(code);
}
