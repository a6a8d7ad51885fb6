use super::{Step, Troubleshooter};
use crate::config::VpnConfig;
use crate::host::{Host, HostCommand};
use crate::ui;
use std::io::{self, Write};
use std::path::Path;

const DASHBOARD_LINES: usize = 5;
const JOURNAL_LINES: usize = 5;
const SECURE_CREDENTIAL_MODES: [&str; 2] = ["600", "400"];

pub(crate) fn is_enabled_cmd(unit: &str) -> HostCommand {
    HostCommand::new("systemctl").arg("is-enabled").arg(unit)
}

pub(crate) fn status_cmd(unit: &str) -> HostCommand {
    HostCommand::new("systemctl")
        .arg("status")
        .arg(unit)
        .arg("--no-pager")
}

pub(crate) fn journal_cmd(unit: &str) -> HostCommand {
    HostCommand::new("journalctl")
        .arg("-u")
        .arg(unit)
        .arg("-n")
        .arg(JOURNAL_LINES.to_string())
        .arg("--no-pager")
}

pub(crate) fn stat_mode_cmd(path: &Path) -> HostCommand {
    HostCommand::new("stat").arg("-c").arg("%a").path_arg(path)
}

pub(crate) fn ping_cmd(server: &str, timeout_secs: u64) -> HostCommand {
    HostCommand::new("ping")
        .arg("-c")
        .arg("1")
        .arg("-W")
        .arg(timeout_secs.to_string())
        .arg(server)
}

pub(crate) fn mount_table_cmd() -> HostCommand {
    HostCommand::new("mount")
}

pub fn is_secure_mode(mode: &str) -> bool {
    SECURE_CREDENTIAL_MODES.contains(&mode)
}

/// Stages of the VPN check; the first failure ends the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum VpnStage {
    Installed,
    DaemonActive,
    Connected,
}

impl VpnStage {
    const CHAIN: [VpnStage; 3] = [
        VpnStage::Installed,
        VpnStage::DaemonActive,
        VpnStage::Connected,
    ];

    pub(crate) fn command(self, vpn: &VpnConfig) -> HostCommand {
        match self {
            VpnStage::Installed => HostCommand::shell(format!("command -v {}", vpn.command)),
            VpnStage::DaemonActive => HostCommand::new("systemctl")
                .arg("is-active")
                .arg(&vpn.daemon_unit),
            VpnStage::Connected => HostCommand::new(&vpn.command).arg("status"),
        }
    }

    fn label(self) -> &'static str {
        match self {
            VpnStage::Installed => "Tailscale installed?",
            VpnStage::DaemonActive => "Is Tailscaled running?",
            VpnStage::Connected => "Tailscale is connected?",
        }
    }

    fn problem(self) -> &'static str {
        match self {
            VpnStage::Installed => "Tailscale command NOT found. Do you have Tailscale installed?",
            VpnStage::DaemonActive => "Tailscaled is NOT running",
            VpnStage::Connected => "Tailscale is NOT connected",
        }
    }
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl<H: Host> Troubleshooter<'_, H> {
    pub(super) fn check_unit_files<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        let step = Step::UnitFiles;
        let systemd_dir = self.cfg.units.systemd_dir.display().to_string();

        let mount_path = self.cfg.installed_unit_path(&self.cfg.units.mount);
        let mount_exists = self.host.exists(&mount_path);
        self.status(out, step, "Mount unit file exists?", mount_exists, None)?;
        if !mount_exists {
            writeln!(out, "    Mount unit NOT found in {systemd_dir}/")?;
            self.problem(
                step,
                format!("Mount unit file NOT found in {systemd_dir}/"),
            );
        }

        let automount_path = self.cfg.installed_unit_path(&self.cfg.units.automount);
        let automount_exists = self.host.exists(&automount_path);
        self.status(out, step, "Automount unit file exists?", automount_exists, None)?;
        if !automount_exists {
            writeln!(
                out,
                "    Automount unit not found (this is OK if mounting at boot)"
            )?;
        }
        self.state.automount_unit_file_exists = automount_exists;
        Ok(())
    }

    pub(super) fn check_enabled_units<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        let step = Step::EnabledUnits;

        let mount = self.exec(out, &is_enabled_cmd(&self.cfg.units.mount))?;
        let mount_enabled = mount.success();
        self.status(
            out,
            step,
            "Mount at boot unit enabled?",
            mount_enabled,
            non_empty(&mount.stdout),
        )?;

        let automount = self.exec(out, &is_enabled_cmd(&self.cfg.units.automount))?;
        let automount_enabled = automount.success();
        self.status(
            out,
            step,
            "Auto-mount at boot unit enabled?",
            automount_enabled,
            non_empty(&automount.stdout),
        )?;

        if automount_enabled && !self.state.automount_unit_file_exists {
            writeln!(
                out,
                "{}",
                ui::warning(
                    "    WARNING: Automount unit is enabled, but automount path does NOT exist."
                )
            )?;
            self.problem(
                step,
                "Automount unit is enabled, but automount path does NOT exist",
            );
        }

        if !mount_enabled && !automount_enabled {
            self.problem(
                step,
                "Neither automount nor mount at boot unit is enabled in systemctl",
            );
        }
        Ok(())
    }

    pub(super) fn show_status_dashboard<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        let units = [
            ("--- Mount status ---", self.cfg.units.mount.clone()),
            ("--- Automount status ---", self.cfg.units.automount.clone()),
        ];
        for (i, (title, unit)) in units.iter().enumerate() {
            if i > 0 {
                writeln!(out)?;
            }
            writeln!(out, "{}", ui::warning(title))?;
            let status = self.exec(out, &status_cmd(unit))?;
            for line in status.combined().lines().take(DASHBOARD_LINES) {
                writeln!(out, "{line}")?;
            }
        }
        Ok(())
    }

    pub(super) fn check_vpn<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        let step = Step::Vpn;
        for stage in VpnStage::CHAIN {
            let output = self.exec(out, &stage.command(&self.cfg.vpn))?;
            let passed = output.success();
            self.status(out, step, stage.label(), passed, non_empty(&output.stdout))?;
            if !passed {
                writeln!(out, "{}", ui::warning(&format!("    {}", stage.problem())))?;
                self.problem(step, stage.problem());
                return Ok(());
            }
        }
        Ok(())
    }

    pub(super) fn check_mount_point<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        let step = Step::MountPoint;
        let mount_point = self.cfg.share.mount_point.display().to_string();

        let exists = self.host.is_dir(&self.cfg.share.mount_point);
        self.status(
            out,
            step,
            format!("Mount point directory exists?: {mount_point}"),
            exists,
            None,
        )?;
        if !exists {
            writeln!(
                out,
                "{}",
                ui::warning(&format!("    Run: sudo mkdir -p {mount_point}"))
            )?;
            self.problem(
                step,
                format!("Mount point directory does NOT exist: {mount_point}"),
            );
        }
        Ok(())
    }

    pub(super) fn check_credentials<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        let step = Step::Credentials;
        let creds_path = self.cfg.share.credentials_file.clone();
        let creds = creds_path.display().to_string();

        let exists = self.host.exists(&creds_path);
        self.status(
            out,
            step,
            format!("Credentials file exists?: {creds}"),
            exists,
            None,
        )?;
        if !exists {
            writeln!(out, "{}", ui::failure("    Credentials file NOT found"))?;
            self.problem(step, "Credentials file NOT found");
            return Ok(());
        }

        let stat = self.exec(out, &stat_mode_cmd(&creds_path))?;
        let mode = if stat.success() {
            stat.stdout.trim().to_string()
        } else {
            String::new()
        };
        let secure = is_secure_mode(&mode);
        let shown_mode = if mode.is_empty() { "unknown" } else { &mode };
        self.status(
            out,
            step,
            format!("Permissions are secure?: {shown_mode}"),
            secure,
            non_empty(&mode),
        )?;
        if !secure {
            writeln!(
                out,
                "{}",
                ui::warning(&format!(
                    "    Permissions may be too open: {shown_mode} (should be 600 or 400)\n    Run: sudo chmod 600 {creds}"
                ))
            )?;
            self.problem(
                step,
                format!("Permissions may be too open: {shown_mode} (should be 600 or 400)"),
            );
        }
        Ok(())
    }

    pub(super) fn check_network<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        let step = Step::Network;
        let server = self.cfg.share.server.clone();

        let ping = self.exec(out, &ping_cmd(&server, self.cfg.share.ping_timeout_secs))?;
        let reachable = ping.success();
        let rtt_lines: Vec<String> = ping
            .combined()
            .lines()
            .filter(|line| line.contains("time="))
            .map(|line| line.trim().to_string())
            .collect();

        self.status(
            out,
            step,
            format!("Can ping {server}?"),
            reachable,
            non_empty(&rtt_lines.join("\n")),
        )?;
        if reachable {
            writeln!(
                out,
                "    {}",
                ui::success(&format!("Confirmed can ping {server}, results:"))
            )?;
            for line in &rtt_lines {
                writeln!(out, "    {line}")?;
            }
        } else {
            writeln!(
                out,
                "{}",
                ui::warning("    Check Tailscale connection and DNS")
            )?;
            self.problem(step, format!("Cannot ping {server}"));
        }
        Ok(())
    }

    pub(super) fn check_current_mount<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        let step = Step::CurrentMount;
        let mount_point = self.cfg.share.mount_point.display().to_string();

        let table = self.exec(out, &mount_table_cmd())?;
        let entry = if table.success() {
            table
                .stdout
                .lines()
                .find(|line| line.contains(&mount_point))
                .map(str::to_string)
        } else {
            None
        };
        let mounted = entry.is_some();

        self.status(out, step, "Share is currently mounted?", mounted, entry)?;
        if !mounted {
            let share = &self.cfg.share;
            writeln!(out, "    {}", ui::failure("Share is NOT currently mounted"))?;
            writeln!(
                out,
                "{}",
                ui::warning(&format!(
                    "    Run: sudo mount -t cifs //{}/{} {} -o credentials={},{}",
                    share.server,
                    share.name,
                    mount_point,
                    share.credentials_file.display(),
                    share.mount_options
                ))
            )?;
            self.problem(step, "Share is NOT currently mounted");
        }
        Ok(())
    }

    pub(super) fn show_journal_logs<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        let units = [
            (
                "--- Mount unit logs (last 5 lines) ---",
                self.cfg.units.mount.clone(),
            ),
            (
                "--- Automount unit logs (last 5 lines) ---",
                self.cfg.units.automount.clone(),
            ),
        ];
        for (i, (title, unit)) in units.iter().enumerate() {
            if i > 0 {
                writeln!(out)?;
            }
            writeln!(out, "{title}")?;
            let logs = self.exec(out, &journal_cmd(unit))?;
            let combined = logs.combined();
            let lines: Vec<&str> = combined.trim().lines().collect();
            let start = lines.len().saturating_sub(JOURNAL_LINES);
            for line in &lines[start..] {
                writeln!(out, "{line}")?;
            }
        }
        Ok(())
    }
}
