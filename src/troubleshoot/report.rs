use crate::state::{Problem, Report};
use crate::ui;
use std::io::{self, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to encode report: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to write report to {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
}

pub fn print_problems<W: Write>(out: &mut W, problems: &[Problem]) -> io::Result<()> {
    if problems.is_empty() {
        writeln!(out, "\n{}\n", ui::success("=== No Problems Found ==="))?;
        return Ok(());
    }

    writeln!(out, "\n{}\n", ui::warning("=== Problems Found ==="))?;
    writeln!(
        out,
        "Troubleshooter discovered {} problems:",
        problems.len()
    )?;
    for problem in problems {
        writeln!(out, "Found in step {}: {}", problem.step, problem.description)?;
    }
    Ok(())
}

pub fn write_json(report: &Report, path: impl AsRef<Path>) -> Result<(), ReportError> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json).map_err(|source| ReportError::Write {
        path: path.display().to_string(),
        source,
    })
}
