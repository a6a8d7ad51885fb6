use std::fmt;
use std::io;
use std::path::Path;
use std::process::Command;
use tracing::{debug, warn};

/// An external command line, kept as argv so nothing passes through a shell
/// unless [`HostCommand::shell`] asks for one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl HostCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Runs `script` through `sh -c`, for shell builtins such as `command -v`.
    pub fn shell(script: impl Into<String>) -> Self {
        Self::new("sh").arg("-c").arg(script)
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.display().to_string())
    }

    pub fn sudo(self) -> Self {
        let mut args = Vec::with_capacity(self.args.len() + 1);
        args.push(self.program);
        args.extend(self.args);
        Self {
            program: "sudo".to_string(),
            args,
        }
    }
}

impl fmt::Display for HostCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process could not be spawned or was killed by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Stdout followed by stderr, the way `2>&1` would present them.
    pub fn combined(&self) -> String {
        let mut out = self.stdout.clone();
        out.push_str(&self.stderr);
        out
    }
}

/// Everything the checklist and the setup actions need from the machine.
pub trait Host {
    fn run(&self, cmd: &HostCommand) -> CommandOutput;
    fn exists(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;
    /// Removes whatever sits at `target` (file or dangling link) and links it to `source`.
    fn replace_with_symlink(&self, source: &Path, target: &Path) -> io::Result<()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemHost;

impl Host for SystemHost {
    fn run(&self, cmd: &HostCommand) -> CommandOutput {
        debug!(command = %cmd, "running command");
        match Command::new(&cmd.program).args(&cmd.args).output() {
            Ok(output) => CommandOutput {
                status: output.status.code(),
                stdout: decode_cmd_output(&output.stdout),
                stderr: decode_cmd_output(&output.stderr),
            },
            Err(err) => {
                warn!(command = %cmd, error = %err, "failed to spawn command");
                CommandOutput {
                    status: None,
                    stdout: String::new(),
                    stderr: err.to_string(),
                }
            }
        }
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn replace_with_symlink(&self, source: &Path, target: &Path) -> io::Result<()> {
        if same_location(source, target) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "source and target are the same file",
            ));
        }
        if target.symlink_metadata().is_ok() {
            std::fs::remove_file(target)?;
        }
        std::os::unix::fs::symlink(source, target)
    }
}

/// Whether `target` names the file `source` resolves to. The last component
/// of `target` is not followed, so an existing link to `source` is replaceable.
fn same_location(source: &Path, target: &Path) -> bool {
    let (Ok(source), Some(parent), Some(name)) =
        (source.canonicalize(), target.parent(), target.file_name())
    else {
        return false;
    };
    let parent = if parent.as_os_str().is_empty() {
        Path::new(".")
    } else {
        parent
    };
    parent
        .canonicalize()
        .map(|parent| parent.join(name) == source)
        .unwrap_or(false)
}

fn decode_cmd_output(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
