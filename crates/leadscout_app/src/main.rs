mod platform;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use leadscout_core::{RunStatus, StartForm};

use platform::logging::{self, LogDestination};
use platform::persistence::{
    default_settings_path, load_settings, load_settings_or_default, save_settings, AppSettings,
};

#[derive(Parser)]
#[command(name = "leadscout")]
#[command(about = "Find small, active YouTube channels and append them to a Google Sheet")]
#[command(version)]
struct Cli {
    /// Settings file (defaults to settings.ron in the user config directory)
    #[arg(long, global = true, value_name = "PATH")]
    settings: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search keywords and append qualifying channels to the sheet
    Run(RunArgs),

    /// Inspect or edit persisted settings
    #[command(subcommand)]
    Settings(SettingsCommand),
}

#[derive(Args)]
struct RunArgs {
    /// Search keyword; repeat for several, processed in order
    #[arg(short, long = "keyword", required = true)]
    keywords: Vec<String>,

    /// Minimum subscriber count (inclusive)
    #[arg(long)]
    min_subs: u64,

    /// Maximum subscriber count (inclusive)
    #[arg(long)]
    max_subs: u64,

    /// Reject channels whose latest upload is older than this many days
    #[arg(long)]
    max_inactive_days: Option<u32>,

    /// Only accept channels from these countries (overrides settings)
    #[arg(long = "country", value_name = "CODE")]
    countries: Vec<String>,

    /// Only accept channels with a contact email in their description
    #[arg(long)]
    require_email: bool,
}

#[derive(Subcommand)]
enum SettingsCommand {
    /// Print current settings with keys redacted
    Show,
    /// Write a default settings file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Add a YouTube Data API key to the rotation
    AddKey { key: String },
    /// Set the target spreadsheet and credentials
    SetSheet {
        sheet_id: String,
        #[arg(long)]
        worksheet: Option<String>,
        /// Service-account JSON key file
        #[arg(long, value_name = "PATH")]
        service_account: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let destination = match cli.command {
        Commands::Run(_) => LogDestination::Both,
        Commands::Settings(_) => LogDestination::Terminal,
    };
    logging::initialize(destination, cli.verbose);

    match run(cli) {
        Ok(RunStatus::Cancelled) => ExitCode::from(130),
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> Result<RunStatus> {
    let path = match cli.settings {
        Some(path) => path,
        None => default_settings_path()?,
    };

    match cli.command {
        Commands::Run(args) => {
            let settings = load_settings(&path)?;
            let form = start_form(args, &settings);
            platform::app::run_scrape(form, &settings)
        }
        Commands::Settings(command) => {
            settings_command(command, &path)?;
            Ok(RunStatus::Completed)
        }
    }
}

fn start_form(args: RunArgs, settings: &AppSettings) -> StartForm {
    let allowed_countries = if args.countries.is_empty() {
        settings.tuning.allowed_countries.clone()
    } else {
        args.countries
    };
    StartForm {
        keywords: args.keywords,
        min_subscribers: args.min_subs,
        max_subscribers: args.max_subs,
        max_inactivity_days: args.max_inactive_days,
        allowed_countries,
        require_email: args.require_email || settings.tuning.require_email,
    }
}

fn settings_command(command: SettingsCommand, path: &Path) -> Result<()> {
    match command {
        SettingsCommand::Show => {
            println!("Settings file: {}", path.display());
            println!("{}", load_settings_or_default(path).describe());
        }
        SettingsCommand::Init { force } => {
            if path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
            save_settings(path, &AppSettings::default())?;
            println!("Wrote default settings to {}", path.display());
        }
        SettingsCommand::AddKey { key } => {
            let mut settings = load_settings(path)?;
            if !settings.add_api_key(&key) {
                bail!("key is blank or already configured");
            }
            save_settings(path, &settings)?;
            println!("{} API key(s) configured", settings.youtube_api_keys.len());
        }
        SettingsCommand::SetSheet {
            sheet_id,
            worksheet,
            service_account,
        } => {
            let mut settings = load_settings(path)?;
            settings.sheet_id = sheet_id.trim().to_string();
            if let Some(worksheet) = worksheet {
                settings.worksheet_name = worksheet;
            }
            if let Some(service_account) = service_account {
                settings.service_account_file = Some(service_account);
            }
            save_settings(path, &settings)?;
            println!("{}", settings.describe());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn run_arguments_parse() {
        let cli = Cli::try_parse_from([
            "leadscout",
            "run",
            "-k",
            "drone reviews",
            "--keyword",
            "fpv",
            "--min-subs",
            "1000",
            "--max-subs",
            "10000",
            "--max-inactive-days",
            "30",
        ])
        .unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(args.keywords, vec!["drone reviews", "fpv"]);
        assert_eq!(args.max_inactive_days, Some(30));
    }

    #[test]
    fn run_requires_a_keyword() {
        assert!(
            Cli::try_parse_from(["leadscout", "run", "--min-subs", "1", "--max-subs", "2"])
                .is_err()
        );
    }

    #[test]
    fn cli_countries_override_settings() {
        let mut settings = AppSettings::default();
        settings.tuning.allowed_countries = vec!["GB".into()];
        settings.tuning.require_email = true;
        let args = RunArgs {
            keywords: vec!["drones".into()],
            min_subs: 1,
            max_subs: 2,
            max_inactive_days: None,
            countries: vec!["US".into()],
            require_email: false,
        };

        let form = start_form(args, &settings);
        assert_eq!(form.allowed_countries, vec!["US"]);
        assert!(form.require_email);
    }
}
