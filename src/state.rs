use std::time::SystemTime;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct CheckResult {
    pub step: u8,
    pub label: String,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Problem {
    pub description: String,
    pub step: u8,
}

/// Everything one troubleshooter run accumulates.
#[derive(Debug, Clone, Default)]
pub struct TroubleshooterState {
    pub problems: Vec<Problem>,
    pub results: Vec<CheckResult>,
    pub steps_run: Vec<u8>,
    /// Written by the unit-file step, read by the enablement step.
    pub automount_unit_file_exists: bool,
    pub verbose: bool,
}

impl TroubleshooterState {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            ..Self::default()
        }
    }

    pub fn record(&mut self, result: CheckResult) {
        self.results.push(result);
    }

    pub fn add_problem(&mut self, step: u8, description: impl Into<String>) {
        self.problems.push(Problem {
            description: description.into(),
            step,
        });
    }

    pub fn into_report(self, host: Option<String>, generated_at: SystemTime) -> Report {
        Report {
            host,
            generated_at: humantime::format_rfc3339_seconds(generated_at).to_string(),
            steps_run: self.steps_run,
            results: self.results,
            problems: self.problems,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct Report {
    pub host: Option<String>,
    pub generated_at: String,
    pub steps_run: Vec<u8>,
    pub results: Vec<CheckResult>,
    pub problems: Vec<Problem>,
}

impl Report {
    pub fn passed(&self) -> bool {
        self.problems.is_empty()
    }
}
