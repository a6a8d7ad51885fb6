mod config;
mod host;
mod prompt;
mod setup;
mod state;
mod troubleshoot;
mod ui;

use clap::{Parser, Subcommand};
use config::{Config, ConfigError};
use host::SystemHost;
use setup::{MountMode, Setup};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use sysinfo::{System, SystemExt};
use thiserror::Error;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use troubleshoot::report::{self, ReportError};
use troubleshoot::Troubleshooter;

const DEFAULT_CONFIG_PATH: &str = "./tailmount.yaml";

#[derive(Parser, Debug)]
#[command(name = "tailmount")]
#[command(version)]
#[command(about = "Dotfiles, SMB-over-Tailscale mount setup and troubleshooting")]
struct Cli {
    /// YAML config file; ./tailmount.yaml is used when present.
    #[arg(long)]
    config: Option<String>,
    #[arg(long)]
    print_default_config: bool,
    /// Without a subcommand an interactive menu is shown.
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Symlink dotfiles into the home directory.
    Dotfiles {
        #[arg(long)]
        dry_run: bool,
    },
    /// Enable the mount or automount unit for the share.
    Setup {
        #[arg(value_enum)]
        mode: MountMode,
        #[arg(long)]
        dry_run: bool,
    },
    /// Run the share diagnostic checklist.
    Troubleshoot {
        /// Echo the output of every command the checklist runs.
        #[arg(long)]
        verbose: bool,
        /// Also write the results as JSON to this path.
        #[arg(long)]
        report: Option<PathBuf>,
    },
}

impl Command {
    fn title(&self) -> &'static str {
        match self {
            Command::Dotfiles { .. } => "Dotfiles Symlinker",
            Command::Setup { .. } => "SMB Over Tailscale Setup",
            Command::Troubleshoot { .. } => "SMB Over Tailscale Troubleshooter",
        }
    }
}

#[derive(Debug, Error)]
enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Report(#[from] ReportError),
    #[error("terminal I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("session task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_tracing();

    let cli = Cli::parse();
    if cli.print_default_config {
        println!("{}", Config::example_yaml());
        return;
    }

    // Prompts and external commands block, so the session lives on the
    // blocking pool and Ctrl+C stays observable.
    let session = tokio::task::spawn_blocking(move || run(cli));

    tokio::select! {
        joined = session => {
            if let Err(err) = joined.map_err(AppError::from).and_then(|result| result) {
                error!(error = %err, "tailmount failed");
                eprintln!("{}", ui::failure(&format!("Error: {err}")));
                std::process::exit(1);
            }
        }
        signal = tokio::signal::ctrl_c() => {
            if let Err(err) = signal {
                error!(error = %err, "failed to listen for Ctrl+C");
                std::process::exit(1);
            }
            println!("\n{}", ui::warning("Interrupted by user"));
            std::process::exit(0);
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    match path {
        Some(path) => {
            info!(path, "loading config");
            Config::load_from_file(path)
        }
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            info!(path = DEFAULT_CONFIG_PATH, "loading config");
            Config::load_from_file(DEFAULT_CONFIG_PATH)
        }
        None => {
            info!("no config file, using built-in defaults");
            let cfg = Config::default();
            cfg.validate()?;
            Ok(cfg)
        }
    }
}

fn run(cli: Cli) -> Result<(), AppError> {
    let cfg = load_config(cli.config.as_deref())?;
    let host = SystemHost;

    let mut input = io::stdin().lock();
    // Unlocked handle: the Ctrl+C branch in main prints too.
    let mut out = io::stdout();

    let command = match cli.command {
        Some(command) => {
            print_banner(&mut out, command.title())?;
            command
        }
        None => interactive_command(&mut input, &mut out)?,
    };

    match command {
        Command::Dotfiles { dry_run } => {
            if dry_run {
                print_dry_run_notice(&mut out)?;
            } else {
                writeln!(
                    out,
                    "{}\n",
                    ui::failure("WARNING: Symlinks will overwrite existing .bashrc and other files.")
                )?;
            }
            Setup::new(&cfg, &host, dry_run).symlink_dotfiles(&mut out)?;
        }
        Command::Setup { mode, dry_run } => {
            if dry_run {
                print_dry_run_notice(&mut out)?;
            }
            Setup::new(&cfg, &host, dry_run).configure(&mut out, mode)?;
        }
        Command::Troubleshoot {
            verbose,
            report: report_path,
        } => {
            let state = Troubleshooter::new(&cfg, &host, verbose).run(&mut out)?;
            if let Some(path) = report_path {
                let run_report = state.into_report(System::new().host_name(), SystemTime::now());
                report::write_json(&run_report, &path)?;
                info!(path = %path.display(), passed = run_report.passed(), "report written");
                writeln!(out, "Report written to {}", path.display())?;
            }
        }
    }
    out.flush()?;
    Ok(())
}

/// The numeric menu plus the follow-up questions of the chosen flow.
fn interactive_command<R: BufRead, W: Write>(input: &mut R, out: &mut W) -> io::Result<Command> {
    writeln!(out, "Choose which program to run:")?;
    writeln!(out, "    1. Dotfile Symlink Creator")?;
    writeln!(out, "    2. SMB Over Tailscale Setup")?;
    writeln!(out, "    3. SMB Over Tailscale Troubleshooter")?;

    let dry_run_prompt = "Run in Dry-Run mode? (No changes will be made)";
    let command = match prompt::choose(input, out, "Enter a number: ", "1/2/3", '1')? {
        '2' => {
            print_banner(out, "SMB Over Tailscale Setup")?;
            let dry_run = prompt::confirm(input, out, dry_run_prompt, false)?;
            let mode = match prompt::choose(
                input,
                out,
                "Mount at boot (b), or mount lazily/automount (l)?",
                "b/l",
                'l',
            )? {
                'b' => MountMode::Boot,
                _ => MountMode::Lazy,
            };
            Command::Setup { mode, dry_run }
        }
        '3' => {
            print_banner(out, "SMB Over Tailscale Troubleshooter")?;
            let verbose = prompt::confirm(
                input,
                out,
                "Display full command output? (Helpful for debugging)",
                false,
            )?;
            Command::Troubleshoot {
                verbose,
                report: None,
            }
        }
        _ => {
            print_banner(out, "Dotfiles Symlinker")?;
            let dry_run = prompt::confirm(input, out, dry_run_prompt, false)?;
            Command::Dotfiles { dry_run }
        }
    };
    Ok(command)
}

fn print_banner<W: Write>(out: &mut W, title: &str) -> io::Result<()> {
    writeln!(out, "#=============================================#")?;
    writeln!(out, "{:^47}", title)
}

fn print_dry_run_notice<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(
        out,
        "{}\n",
        ui::warning(">>> DRY-RUN MODE ACTIVE: No changes will be written to disk. <<<")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn interactive(answers: &str) -> Command {
        let mut input = Cursor::new(answers.as_bytes().to_vec());
        let mut out = Vec::new();
        interactive_command(&mut input, &mut out).unwrap()
    }

    #[test]
    fn menu_defaults_to_dotfiles_without_dry_run() {
        assert!(matches!(interactive("\n\n"), Command::Dotfiles { dry_run: false }));
    }

    #[test]
    fn menu_setup_defaults_to_lazy_mount() {
        match interactive("2\ny\n\n") {
            Command::Setup { mode, dry_run } => {
                assert_eq!(mode, MountMode::Lazy);
                assert!(dry_run);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn menu_setup_boot_mode() {
        assert!(matches!(
            interactive("2\nn\nb\n"),
            Command::Setup {
                mode: MountMode::Boot,
                dry_run: false
            }
        ));
    }

    #[test]
    fn menu_troubleshooter_asks_for_verbose_output() {
        assert!(matches!(
            interactive("3\ny\n"),
            Command::Troubleshoot {
                verbose: true,
                report: None
            }
        ));
    }

    #[test]
    fn closed_stdin_falls_back_to_defaults() {
        assert!(matches!(interactive(""), Command::Dotfiles { dry_run: false }));
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        let err = load_config(Some("/nonexistent/tailmount.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["tailmount", "setup", "boot", "--dry-run"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Command::Setup {
                mode: MountMode::Boot,
                dry_run: true
            })
        ));

        let cli = Cli::try_parse_from([
            "tailmount",
            "--config",
            "custom.yaml",
            "troubleshoot",
            "--verbose",
            "--report",
            "out.json",
        ])
        .unwrap();
        assert_eq!(cli.config.as_deref(), Some("custom.yaml"));
        assert!(matches!(
            cli.command,
            Some(Command::Troubleshoot { verbose: true, report: Some(_) })
        ));
    }
}
