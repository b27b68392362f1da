use anyhow::Result;
use chrono::Utc;
use rollcall::cli::{Args, Command, print_help};
use rollcall::config::Config;
use rollcall::context::{AppContext, StandardContext};
use rollcall::job;
use rollcall::logging;
use rollcall::summary::RunMeta;
use std::env;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = match Args::parse(env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("Run 'rollcall --help' for usage.");
            return Ok(ExitCode::from(2));
        }
    };

    if args.command == Command::Help {
        print_help("rollcall");
        return Ok(ExitCode::SUCCESS);
    }

    let ctx = StandardContext::new(args.root.clone());
    let level = logging::resolve_level(
        args.verbose,
        env::var(logging::LOG_LEVEL_ENV).ok().as_deref(),
    );
    logging::init(level, ctx.get_log_path().as_deref())?;

    if args.command == Command::Init {
        return init_config(&ctx);
    }

    let mut config = match load_config(&args, &ctx) {
        Ok(config) => config,
        Err(e) => {
            log::error!("{:#}", e);
            return Ok(ExitCode::FAILURE);
        }
    };
    config.apply_process_env();
    if args.dry_run {
        config.dry_run = true;
    }

    let now = Utc::now();
    let started_at = match config.tz() {
        Ok(tz) => now.with_timezone(&tz).fixed_offset(),
        // Rejected by validate() below; the failure summary shows UTC.
        Err(_) => now.fixed_offset(),
    };
    let meta = RunMeta::new(config.check_name.clone(), started_at)
        .with_ci_env(|key| env::var(key).ok());

    if let Err(e) = config.validate() {
        log::error!("Configuration error: {}", e);
        if args.command == Command::Run {
            job::publish_failure(&config, &meta, &e.to_string()).await;
        }
        return Ok(ExitCode::FAILURE);
    }

    if args.command == Command::CheckConfig {
        println!("Configuration OK");
        return Ok(ExitCode::SUCCESS);
    }

    let Ok((discord, sheets)) = job::connect(&config, &meta).await else {
        return Ok(ExitCode::FAILURE);
    };

    let today = started_at.date_naive();
    log::info!(
        "Starting {} for {}{}",
        config.check_name,
        today,
        if config.dry_run { " (dry run)" } else { "" }
    );

    match job::run(&config, today, meta, &discord, &sheets, &discord).await {
        Ok(_) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            log::error!("{:#}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}

fn load_config(args: &Args, ctx: &dyn AppContext) -> Result<Config> {
    let loaded = match &args.config {
        Some(path) => Config::load_from_path(path),
        None => Config::load(ctx),
    };
    match loaded {
        Ok(config) => Ok(config),
        // Everything can come from the environment in CI, so a missing
        // default config file is not fatal.
        Err(e) if args.config.is_none() && Config::is_missing_config_error(&e) => {
            log::info!(
                "No config file at {}; using defaults and environment",
                Config::get_path_string(ctx).unwrap_or_default()
            );
            Ok(Config::default())
        }
        Err(e) => Err(e),
    }
}

fn init_config(ctx: &dyn AppContext) -> Result<ExitCode> {
    let path = ctx.get_config_file_path()?;
    if path.exists() {
        println!("Config already exists at {}", path.display());
        return Ok(ExitCode::SUCCESS);
    }
    Config::default().save(ctx)?;
    println!("Wrote default config to {}", path.display());
    Ok(ExitCode::SUCCESS)
}
