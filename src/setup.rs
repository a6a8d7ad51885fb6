use crate::config::Config;
use crate::host::{Host, HostCommand};
use crate::ui;
use std::io::{self, Write};
use std::path::Path;
use tracing::{info, warn};

/// Which of the two mutually exclusive units should be active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum MountMode {
    /// Mount the share eagerly at boot.
    Boot,
    /// Mount lazily on first access through the automount unit.
    Lazy,
}

pub struct Setup<'a, H: Host> {
    cfg: &'a Config,
    host: &'a H,
    dry_run: bool,
}

impl<'a, H: Host> Setup<'a, H> {
    pub fn new(cfg: &'a Config, host: &'a H, dry_run: bool) -> Self {
        Self { cfg, host, dry_run }
    }

    pub fn configure<W: Write>(&self, out: &mut W, mode: MountMode) -> io::Result<()> {
        match mode {
            MountMode::Boot => self.enable_mount_at_boot(out)?,
            MountMode::Lazy => self.enable_automount(out)?,
        }
        writeln!(out, "\nConfiguration complete.")
    }

    pub fn enable_mount_at_boot<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let units = &self.cfg.units;

        writeln!(out, "Attempting to disable automount if enabled")?;
        self.run_command(out, systemctl("disable", &units.automount))?;

        writeln!(out, "Creating symlink for mount at boot")?;
        self.link_unit(out, &units.mount)?;

        writeln!(out, "Enabling mount at boot in systemctl")?;
        self.run_command(out, systemctl("enable", &units.mount))
    }

    pub fn enable_automount<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let units = &self.cfg.units;

        writeln!(out, "Attempting to disable mount at boot if enabled")?;
        self.run_command(out, systemctl("disable", &units.mount))?;

        writeln!(out, "Creating both symlinks (Both are required)")?;
        for unit in [&units.mount, &units.automount] {
            self.link_unit(out, unit)?;
        }

        writeln!(out, "Enabling only automount in systemctl")?;
        self.run_command(out, systemctl("enable", &units.automount))
    }

    /// Links every configured dotfile into the home directory. A failed link
    /// is reported and the remaining dotfiles are still attempted.
    pub fn symlink_dotfiles<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for name in &self.cfg.dotfiles.files {
            let source = self.cfg.source_dir.join(name);
            let target = self.cfg.dotfiles.home_dir.join(name);
            self.create_symlink(out, &source, &target)?;
        }
        Ok(())
    }

    fn link_unit<W: Write>(&self, out: &mut W, unit: &str) -> io::Result<()> {
        let cmd = HostCommand::new("ln")
            .arg("-sf")
            .path_arg(&self.cfg.source_unit_path(unit))
            .path_arg(&self.cfg.units.systemd_dir)
            .sudo();
        self.run_command(out, cmd)
    }

    fn run_command<W: Write>(&self, out: &mut W, cmd: HostCommand) -> io::Result<()> {
        if self.dry_run {
            return writeln!(out, "{} Would execute: {cmd}", ui::warning("[DRY-RUN]"));
        }

        info!(command = %cmd, "applying setup command");
        let output = self.host.run(&cmd);
        if output.success() {
            writeln!(out, "{}: {}", ui::success("Success"), output.combined().trim_end())
        } else {
            warn!(command = %cmd, status = ?output.status, "setup command failed");
            let reason = match output.status {
                Some(code) => format!("exit status {code}: {}", output.combined().trim_end()),
                None => output.stderr.trim_end().to_string(),
            };
            writeln!(out, "{}: {cmd}: {reason}", ui::failure("Error"))
        }
    }

    fn create_symlink<W: Write>(&self, out: &mut W, source: &Path, target: &Path) -> io::Result<()> {
        if self.dry_run {
            return writeln!(
                out,
                "{} Would symlink: {} -> {}",
                ui::warning("[DRY-RUN]"),
                source.display(),
                target.display()
            );
        }

        if source == target {
            return self.symlink_failed(out, target, "source and target are the same file");
        }
        if !self.host.exists(source) {
            return self.symlink_failed(
                out,
                target,
                &format!("source {} does not exist", source.display()),
            );
        }

        match self.host.replace_with_symlink(source, target) {
            Ok(()) => {
                info!(source = %source.display(), target = %target.display(), "symlink created");
                writeln!(
                    out,
                    "{} {} -> {}",
                    ui::success("Success:"),
                    source.display(),
                    target.display()
                )
            }
            Err(err) => self.symlink_failed(out, target, &err.to_string()),
        }
    }

    fn symlink_failed<W: Write>(&self, out: &mut W, target: &Path, reason: &str) -> io::Result<()> {
        warn!(target = %target.display(), error = reason, "symlink failed");
        writeln!(
            out,
            "{}",
            ui::failure(&format!(
                "Error creating symlink for {}: {reason}",
                target.display()
            ))
        )
    }
}

fn systemctl(verb: &str, unit: &str) -> HostCommand {
    HostCommand::new("systemctl").arg(verb).arg(unit).sudo()
}
