// File: ./src/cli.rs
//! Command-line parsing and help text for the `rollcall` binary.

use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Reconcile today's reactions and publish the summary.
    Run,
    /// Load and validate the configuration, then exit.
    CheckConfig,
    /// Write a default config file if none exists.
    Init,
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    pub command: Command,
    pub root: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub dry_run: bool,
    pub verbose: bool,
}

impl Args {
    /// Parses everything after the binary name.
    pub fn parse<I, S>(args: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut parsed = Args {
            command: Command::Run,
            root: None,
            config: None,
            dry_run: false,
            verbose: false,
        };
        let mut iter = args.into_iter();
        while let Some(arg) = iter.next() {
            match arg.as_ref() {
                "-h" | "--help" | "help" => parsed.command = Command::Help,
                "check-config" => parsed.command = Command::CheckConfig,
                "init" => parsed.command = Command::Init,
                "-n" | "--dry-run" => parsed.dry_run = true,
                "-v" | "--verbose" => parsed.verbose = true,
                "-r" | "--root" => {
                    let value = iter.next().ok_or("--root needs a path")?;
                    parsed.root = Some(PathBuf::from(value.as_ref()));
                }
                "-c" | "--config" => {
                    let value = iter.next().ok_or("--config needs a path")?;
                    parsed.config = Some(PathBuf::from(value.as_ref()));
                }
                other => return Err(format!("Unknown argument '{}'", other)),
            }
        }
        Ok(parsed)
    }
}

pub fn print_help(binary_name: &str) {
    println!(
        "Rollcall v{} - Daily check-in reconciliation from Discord reactions to Google Sheets",
        env!("CARGO_PKG_VERSION")
    );
    println!();
    println!("USAGE:");
    println!("    {} [OPTIONS]                 Run today's reconciliation", binary_name);
    println!("    {} check-config [OPTIONS]    Validate the configuration and exit", binary_name);
    println!("    {} init [--root <path>]      Write a default config file", binary_name);
    println!("    {} --help                    Show this help message", binary_name);
    println!();
    println!("OPTIONS:");
    println!("    -r, --root <path>     Use a different directory for config and data.");
    println!("    -c, --config <file>   Read this config file instead of the default one.");
    println!("    -n, --dry-run         Compute and report every change without writing.");
    println!("    -v, --verbose         Debug logging (otherwise ROLLCALL_LOG or info).");
    println!("    -h, --help            Show this help message.");
    println!();
    println!("ENVIRONMENT:");
    println!("    DISCORD_TOKEN         Bot token (DISCORD_BOT_TOKEN also accepted).");
    println!("    GOOGLE_CREDS_JSON     Service account key JSON.");
    println!("    DRY_RUN               'true' or '1' forces a dry run.");
    println!("    CHECK_NAME            Label shown in the summary.");
    println!("    TZ                    Timezone that decides what \"today\" is.");
    println!();
    println!("EXIT STATUS:");
    println!("    0 when a summary was published, including failure summaries.");
    println!("    1 on a configuration error or when the summary could not be posted.");
}
