//! # Quick-apply CLI
//!
//! Searches job listings and submits their quick-apply forms using the
//! answers in a profile file.

mod args;

use args::Args;
use clap::Parser;
use console::style;
use dialoguer::Password;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn, LevelFilter};
use quickapply::{
    init_logger, ApplyError, BrowserConfig, CancellationToken, Credentials, DriverConfig,
    EligibilityPolicy, OpenAiConfig, PathsConfig, RunConfig, RunSummary, SearchConfig, Selectors,
};
use std::process::ExitCode;
use std::time::Duration;

/// Reads the password from the terminal when it was not configured.
fn prompt_password(email: &str) -> Option<String> {
    Password::new()
        .with_prompt(format!("Password for {}", email))
        .interact()
        .ok()
        .filter(|p| !p.is_empty())
}

fn credentials(args: &Args) -> Option<Credentials> {
    let email = args.email.clone()?;
    let password = match &args.password {
        Some(p) => p.clone(),
        None => prompt_password(&email)?,
    };
    Some(Credentials { email, password })
}

fn build_config(args: &Args) -> Result<RunConfig, ApplyError> {
    let selectors = match &args.selectors {
        Some(path) => Selectors::from_file(path)?,
        None => Selectors::default(),
    };
    let openai = args.openai_api_key.clone().map(|key| OpenAiConfig {
        model: args.openai_model.clone(),
        ..OpenAiConfig::new(key)
    });

    Ok(RunConfig {
        credentials: credentials(args),
        openai,
        paths: PathsConfig {
            profile: args.profile.clone(),
            cv: args.cv.clone(),
            cover_letter: args.cover_letter.clone(),
            session_state: args.state_file.clone(),
            failed_applications: args.failed_applications.clone(),
        },
        browser: BrowserConfig {
            headless: args.headless,
            chrome_path: args.chrome_path.clone(),
            ..BrowserConfig::default()
        },
        search: SearchConfig {
            keywords: args.keywords.clone(),
            location: args.location.clone(),
            distance: args.distance,
            max_applications: args.max_applications,
            eligibility: EligibilityPolicy {
                require_quick_apply: !args.include_external,
                ..EligibilityPolicy::default()
            },
        },
        driver: DriverConfig {
            max_stuck: args.max_stuck,
            sweep_seed: args.seed,
            ..DriverConfig::default()
        },
        selectors,
    })
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!("{}", style("Run summary").bold());
    println!("  {} {}", style("submitted:").green(), summary.submitted);
    println!("  {} {}", style("abandoned:").yellow(), summary.abandoned);
    println!("  {} {}", style("skipped:  ").dim(), summary.skipped);
    if !summary.failed_ids.is_empty() {
        println!(
            "  {} {}",
            style("recorded as failed:").red(),
            summary.failed_ids.join(", ")
        );
    }
    if summary.cancelled {
        println!("  {}", style("stopped early by Ctrl-C").yellow());
    }
}

/// Spinner shown instead of the narration when logging is quiet.
fn quiet_spinner(level: LevelFilter) -> Option<ProgressBar> {
    if level >= LevelFilter::Info {
        return None;
    }
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg} [{elapsed}]") {
        spinner.set_style(style);
    }
    spinner.set_message("Applying to job listings...");
    spinner.enable_steady_tick(Duration::from_millis(120));
    Some(spinner)
}

/// The main entry point of the application.
fn main() -> ExitCode {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Ignoring unreadable .env file: {}", e);
        }
    }

    let args = Args::parse();
    let level: LevelFilter = args.level.into();
    init_logger(level);

    // Ensure only one run shares the profile directory and the registry.
    if let Err(e) = quickapply::utils::ensure_single_instance() {
        error!("{}", e);
        return ExitCode::FAILURE;
    }

    // Handle the clean session option.
    if args.clean {
        match quickapply::utils::wipe_user_data_dir() {
            Ok(_) => {
                info!("Session information successfully removed.");
                return ExitCode::SUCCESS;
            }
            Err(e) => {
                error!("Failed to remove session information: {}", e);
                return ExitCode::FAILURE;
            }
        }
    }

    let config = match build_config(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let cancel = CancellationToken::new();
    let handler_token = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        if handler_token.is_cancelled() {
            std::process::exit(130);
        }
        warn!("[!] Ctrl-C received, finishing the current application. Press again to quit now.");
        handler_token.cancel();
    }) {
        warn!("Could not install the Ctrl-C handler: {}", e);
    }

    let spinner = quiet_spinner(level);
    let result = quickapply::run(&config, cancel);
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    match result {
        Ok(summary) => {
            print_summary(&summary);
            if summary.cancelled {
                ExitCode::from(130)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) if !e.is_fatal() => {
            warn!("{}", e);
            ExitCode::from(130)
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
