pub mod checks;
pub mod report;

use crate::config::Config;
use crate::host::{CommandOutput, Host, HostCommand};
use crate::state::{CheckResult, TroubleshooterState};
use crate::ui;
use std::io::{self, Write};
use tracing::debug;

/// The diagnostic steps, in the order they run and are numbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    UnitFiles,
    EnabledUnits,
    StatusDashboard,
    Vpn,
    MountPoint,
    Credentials,
    Network,
    CurrentMount,
    JournalLogs,
}

impl Step {
    pub const ALL: [Step; 9] = [
        Step::UnitFiles,
        Step::EnabledUnits,
        Step::StatusDashboard,
        Step::Vpn,
        Step::MountPoint,
        Step::Credentials,
        Step::Network,
        Step::CurrentMount,
        Step::JournalLogs,
    ];

    pub fn number(self) -> u8 {
        match self {
            Step::UnitFiles => 1,
            Step::EnabledUnits => 2,
            Step::StatusDashboard => 3,
            Step::Vpn => 4,
            Step::MountPoint => 5,
            Step::Credentials => 6,
            Step::Network => 7,
            Step::CurrentMount => 8,
            Step::JournalLogs => 9,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Step::UnitFiles => "Checking systemd unit files...",
            Step::EnabledUnits => "Checking enabled units... (Only 1 must be enabled)",
            Step::StatusDashboard => "Displaying systemctl status dashboards...",
            Step::Vpn => "Checking Tailscale...",
            Step::MountPoint => "Checking mount point directory...",
            Step::Credentials => "Checking credentials file...",
            Step::Network => "Checking network connectivity...",
            Step::CurrentMount => "Checking current mount status...",
            Step::JournalLogs => "Recent systemd journal entries...",
        }
    }

    /// Dashboard and journal steps only display information.
    pub fn is_informational(self) -> bool {
        matches!(self, Step::StatusDashboard | Step::JournalLogs)
    }
}

pub struct Troubleshooter<'a, H: Host> {
    cfg: &'a Config,
    host: &'a H,
    state: TroubleshooterState,
}

impl<'a, H: Host> Troubleshooter<'a, H> {
    pub fn new(cfg: &'a Config, host: &'a H, verbose: bool) -> Self {
        Self {
            cfg,
            host,
            state: TroubleshooterState::new(verbose),
        }
    }

    /// Runs every step in order, then prints the problem summary.
    pub fn run<W: Write>(mut self, out: &mut W) -> io::Result<TroubleshooterState> {
        for step in Step::ALL {
            self.run_step(step, out)?;
        }
        report::print_problems(out, &self.state.problems)?;
        Ok(self.state)
    }

    fn run_step<W: Write>(&mut self, step: Step, out: &mut W) -> io::Result<()> {
        debug!(
            step = step.number(),
            informational = step.is_informational(),
            "running troubleshooter step"
        );
        self.state.steps_run.push(step.number());

        if step != Step::UnitFiles {
            writeln!(out)?;
        }
        writeln!(
            out,
            "{}",
            ui::heading(&format!("[{}] {}", step.number(), step.title()))
        )?;

        match step {
            Step::UnitFiles => self.check_unit_files(out),
            Step::EnabledUnits => self.check_enabled_units(out),
            Step::StatusDashboard => self.show_status_dashboard(out),
            Step::Vpn => self.check_vpn(out),
            Step::MountPoint => self.check_mount_point(out),
            Step::Credentials => self.check_credentials(out),
            Step::Network => self.check_network(out),
            Step::CurrentMount => self.check_current_mount(out),
            Step::JournalLogs => self.show_journal_logs(out),
        }
    }

    fn exec<W: Write>(&self, out: &mut W, cmd: &HostCommand) -> io::Result<CommandOutput> {
        let output = self.host.run(cmd);
        if self.state.verbose {
            echo_output(out, &output)?;
        }
        Ok(output)
    }

    fn status<W: Write>(
        &mut self,
        out: &mut W,
        step: Step,
        label: impl Into<String>,
        passed: bool,
        output: Option<String>,
    ) -> io::Result<()> {
        let label = label.into();
        writeln!(out, "{} {}", ui::status_glyph(passed), label)?;
        self.state.record(CheckResult {
            step: step.number(),
            label,
            passed,
            output,
        });
        Ok(())
    }

    fn problem(&mut self, step: Step, description: impl Into<String>) {
        self.state.add_problem(step.number(), description);
    }
}

fn echo_output<W: Write>(out: &mut W, output: &CommandOutput) -> io::Result<()> {
    let stdout = output.stdout.trim();
    let stderr = output.stderr.trim();
    if !stdout.is_empty() {
        writeln!(out, "{} {}", ui::warning("Command output:"), ui::muted(stdout))
    } else if !stderr.is_empty() {
        writeln!(out, "{} {}", ui::failure("Command error:"), ui::muted(stderr))
    } else {
        writeln!(
            out,
            "{} {}",
            ui::failure("Command output:"),
            ui::muted("no output to display")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::checks::tests::healthy_host;
    use super::*;
    use crate::host::testing::FakeHost;

    fn run(host: &FakeHost, verbose: bool) -> (TroubleshooterState, String) {
        let cfg = Config::default();
        let mut out = Vec::new();
        let state = Troubleshooter::new(&cfg, host, verbose)
            .run(&mut out)
            .expect("writing to a Vec cannot fail");
        (state, String::from_utf8(out).unwrap())
    }

    #[test]
    fn steps_run_in_order_on_a_healthy_host() {
        let (state, text) = run(&healthy_host(&Config::default()), false);
        assert_eq!(state.steps_run, vec![1, 2, 3, 4, 5, 6, 7, 8, 9]);
        assert!(state.problems.is_empty(), "{:?}", state.problems);
        assert!(state.results.iter().all(|r| r.passed));
        assert!(text.contains("=== No Problems Found ==="));
    }

    #[test]
    fn steps_run_in_order_when_everything_fails() {
        let (state, text) = run(&FakeHost::new(), false);
        assert_eq!(state.steps_run, vec![1, 2, 3, 4, 5, 6, 7, 8, 9]);

        let problem_steps: Vec<u8> = state.problems.iter().map(|p| p.step).collect();
        assert_eq!(problem_steps, vec![1, 2, 4, 5, 6, 7, 8]);
        assert!(text.contains("Troubleshooter discovered 7 problems:"));

        let mut last_header = 0;
        for n in 1..=9 {
            let pos = text
                .find(&format!("[{n}] "))
                .unwrap_or_else(|| panic!("missing header for step {n}"));
            assert!(pos >= last_header, "step {n} printed out of order");
            last_header = pos;
        }
    }

    #[test]
    fn informational_steps_never_record_anything() {
        let (state, _) = run(&FakeHost::new(), false);
        for step in Step::ALL.iter().filter(|s| s.is_informational()) {
            let n = step.number();
            assert!(state.problems.iter().all(|p| p.step != n));
            assert!(state.results.iter().all(|r| r.step != n));
        }
    }

    #[test]
    fn result_steps_are_non_decreasing() {
        let (state, _) = run(&FakeHost::new(), false);
        let steps: Vec<u8> = state.results.iter().map(|r| r.step).collect();
        let mut sorted = steps.clone();
        sorted.sort();
        assert_eq!(steps, sorted);
    }

    #[test]
    fn verbose_echoes_command_output() {
        let (_, quiet) = run(&healthy_host(&Config::default()), false);
        let (_, loud) = run(&healthy_host(&Config::default()), true);
        assert!(!quiet.contains("Command output:"));
        assert!(loud.contains("Command output: enabled"));
        assert!(loud.contains("no output to display"));
    }

    #[test]
    fn verbose_echoes_command_errors() {
        let cfg = Config::default();
        let host = FakeHost::new().fail(&checks::is_enabled_cmd(&cfg.units.mount), "boom");
        let (_, quiet) = run(&host, false);
        let (_, loud) = run(&host, true);
        assert!(!quiet.contains("boom"));
        assert!(loud.contains("Command error: boom"));
    }

    #[test]
    fn step_numbers_match_positions() {
        for (i, step) in Step::ALL.iter().enumerate() {
            assert_eq!(step.number() as usize, i + 1);
        }
    }
}
