//! bufrepl - CLI

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use bufrepl::repl::backend_trait::Language;
use bufrepl::repl::line::{paint, LineRepl, LineReplConfig};
use bufrepl::util::config::{self, UserConfig, MAX_INDENT};
use bufrepl::util::logger;
use bufrepl::{run, NAME, VERSION};

/// A buffer-backed REPL for a scripting and a command language
#[derive(Parser, Debug)]
#[command(name = "bufrepl")]
#[command(version = VERSION)]
#[command(about = NAME, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file (default: ~/.config/bufrepl/config.toml)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Language for plain input
    #[arg(short, long, value_parser = parse_language, global = true)]
    lang: Option<Language>,

    /// Show intermediate values
    #[arg(long, global = true)]
    inspect: bool,

    /// Indent output by N spaces
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u8).range(0..=MAX_INDENT as i64), global = true)]
    indent: Option<u8>,

    /// Disable coloured output
    #[arg(long, global = true)]
    no_color: bool,

    /// Enable verbose output (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the interactive REPL (default)
    Repl {
        /// Persist line history to FILE
        #[arg(long, value_name = "FILE")]
        history_file: Option<PathBuf>,

        /// Use vi key bindings
        #[arg(long)]
        vi: bool,
    },

    /// Evaluate a file, one buffer line per source line
    Run {
        /// Source file to run
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Evaluate code from the command line
    Eval {
        /// Code to evaluate
        #[arg(value_name = "CODE")]
        code: String,
    },

    /// Print the effective configuration
    Config,
}

fn parse_language(value: &str) -> Result<Language, String> {
    match value {
        "lua" => Ok(Language::Lua),
        "vim" => Ok(Language::Vim),
        other => Err(format!("unknown language '{}', expected lua or vim", other)),
    }
}

fn load_config(args: &Args) -> Result<UserConfig> {
    let mut user = match &args.config {
        Some(path) => config::load_from_path(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => config::load_user_config().context("Failed to load user config")?,
    };
    if let Some(lang) = args.lang {
        user.repl.lang = lang;
    }
    if args.inspect {
        user.repl.inspect = true;
    }
    if let Some(indent) = args.indent {
        user.repl.indent = indent as usize;
    }
    Ok(user)
}

fn print_output(
    source: &str,
    user: &UserConfig,
    colors: bool,
) -> Result<()> {
    for (class, text) in run(source, &user.repl)? {
        println!("{}", paint(class, &text, colors));
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let user = load_config(&args)?;
    logger::init_with_level(user.log.level.more_verbose(args.verbose));

    if args.verbose > 0 {
        eprintln!("{} version: {}", NAME, VERSION);
        eprintln!("Host: {}", std::env::consts::OS);
    }

    let colors = !args.no_color;
    match args.command {
        None => {
            LineRepl::new(&user.repl, LineReplConfig {
                colors,
                ..LineReplConfig::default()
            })?
            .run()?;
        }
        Some(Commands::Repl { history_file, vi }) => {
            let line = LineReplConfig {
                vi_mode: vi,
                history_file,
                colors,
                ..LineReplConfig::default()
            };
            LineRepl::new(&user.repl, line)?.run()?;
        }
        Some(Commands::Run { file }) => {
            let source = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read file: {}", file.display()))?;
            print_output(&source, &user, colors)
                .with_context(|| format!("Failed to run: {}", file.display()))?;
        }
        Some(Commands::Eval { code }) => {
            print_output(&code, &user, colors).context("Failed to evaluate code")?;
        }
        Some(Commands::Config) => {
            print!("{}", toml::to_string_pretty(&user)?);
        }
    }

    Ok(())
}
