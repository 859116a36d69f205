//! Step identity and the mutable outcome record of one step.
//!
//! A [`StepResult`] is created together with its step, mutated while the
//! step runs and handed read-only to progress notifiers and reporting once the
//! step has finished.

use std::{fmt, sync::Arc};

use crate::{
    error::StepError,
    name::{NameParameter, StepNameFormat},
    status::ExecutionStatus,
    time::ExecutionTime,
};

/// Identity and current display name of a step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StepInfo {
    group_prefix: String,
    number: usize,
    step_type: Option<String>,
    format: Arc<StepNameFormat>,
    name: String,
}

impl StepInfo {
    /// Create step information with every parameter rendered as unknown.
    #[must_use]
    pub fn new(
        group_prefix: impl Into<String>,
        number: usize,
        step_type: Option<String>,
        format: StepNameFormat,
    ) -> Self {
        let mut info = Self {
            group_prefix: group_prefix.into(),
            number,
            step_type,
            format: Arc::new(format),
            name: String::new(),
        };
        info.name = info.render(&[]);
        info
    }

    /// Prefix shared by the steps of one group, e.g. `"2."` for sub-steps of
    /// step 2. Empty for top-level steps.
    #[must_use]
    pub fn group_prefix(&self) -> &str { &self.group_prefix }

    /// Position of the step within its group, starting at 1.
    #[must_use]
    pub fn number(&self) -> usize { self.number }

    /// Step type keyword (`Given`, `When`, ...), if declared.
    #[must_use]
    pub fn step_type(&self) -> Option<&str> { self.step_type.as_deref() }

    /// Rendered step name.
    #[must_use]
    pub fn name(&self) -> &str { &self.name }

    /// Identity label, e.g. `"2.1"`.
    #[must_use]
    pub fn label(&self) -> String { format!("{}{}", self.group_prefix, self.number) }

    /// Prefix handed to sub-steps of this step.
    #[must_use]
    pub fn sub_step_prefix(&self) -> String { format!("{}.", self.label()) }

    fn render(&self, params: &[NameParameter]) -> String {
        let name = self.format.render(params);
        match &self.step_type {
            Some(step_type) => format!("{step_type} {name}"),
            None => name,
        }
    }

    pub(crate) fn update_name(&mut self, params: &[NameParameter]) { self.name = self.render(params); }
}

impl fmt::Display for StepInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}. {}", self.group_prefix, self.number, self.name)
    }
}

/// Outcome of one step.
#[derive(Clone, Debug)]
pub struct StepResult {
    info: StepInfo,
    status: ExecutionStatus,
    status_details: Option<String>,
    own_details: Option<String>,
    execution_exception: Option<StepError>,
    execution_time: Option<ExecutionTime>,
    comments: Vec<String>,
    sub_steps: Vec<StepResult>,
}

impl StepResult {
    /// Create a result for a step that has not run.
    #[must_use]
    pub fn new(info: StepInfo) -> Self {
        Self {
            info,
            status: ExecutionStatus::NotRun,
            status_details: None,
            own_details: None,
            execution_exception: None,
            execution_time: None,
            comments: Vec::new(),
            sub_steps: Vec::new(),
        }
    }

    /// Step identity and current name.
    #[must_use]
    pub fn info(&self) -> &StepInfo { &self.info }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> ExecutionStatus { self.status }

    /// Status detail text, prefixed with the step identity.
    #[must_use]
    pub fn status_details(&self) -> Option<&str> { self.status_details.as_deref() }

    /// Error that failed the step, if any.
    #[must_use]
    pub fn execution_exception(&self) -> Option<&StepError> { self.execution_exception.as_ref() }

    /// Timing of the step body, once it has run.
    #[must_use]
    pub fn execution_time(&self) -> Option<ExecutionTime> { self.execution_time }

    /// Comments recorded while the step ran, in order.
    #[must_use]
    pub fn comments(&self) -> &[String] { &self.comments }

    /// Results of the sub-steps produced by the step body.
    #[must_use]
    pub fn sub_steps(&self) -> &[StepResult] { &self.sub_steps }

    /// Set the status and, when `details` is not blank, the detail text.
    ///
    /// Details are prefixed with `Step {label}: ` and every line break is
    /// followed by a tab so nested output stays aligned.
    pub fn set_status(&mut self, status: ExecutionStatus, details: Option<&str>) {
        self.status = status;
        if let Some(details) = details.map(str::trim).filter(|d| !d.is_empty()) {
            let indented = details.replace("\r\n", "\n").replace('\n', "\n\t");
            let formatted = format!("Step {}: {indented}", self.info.label());
            self.own_details = Some(formatted.clone());
            self.status_details = Some(formatted);
        }
    }

    /// Adopt the status and detail text of a representative sub-step.
    pub(crate) fn adopt_status(&mut self, status: ExecutionStatus, details: Option<String>) {
        self.status = status;
        if details.is_some() {
            self.own_details.clone_from(&details);
            self.status_details = details;
        }
    }

    /// Record the error that failed the step.
    pub fn set_execution_exception(&mut self, error: StepError) {
        self.execution_exception = Some(error);
    }

    /// Re-render the display name from formatted parameters.
    pub fn update_name(&mut self, params: &[NameParameter]) { self.info.update_name(params); }

    /// Record the step timing.
    pub fn set_execution_time(&mut self, time: ExecutionTime) { self.execution_time = Some(time); }

    /// Append a comment.
    pub fn add_comment(&mut self, comment: impl Into<String>) { self.comments.push(comment.into()); }

    /// Attach the results of finished (or never started) sub-steps.
    pub fn set_sub_steps(&mut self, sub_steps: Vec<StepResult>) { self.sub_steps = sub_steps; }

    /// Merge the detail text of every descendant into this result.
    ///
    /// The merge starts from the step's own details each time, so calling it
    /// repeatedly yields the same text.
    pub fn include_sub_step_details(&mut self) {
        let mut entries: Vec<String> = Vec::new();
        if let Some(own) = &self.own_details {
            entries.push(own.clone());
        }
        for sub_step in &self.sub_steps {
            sub_step.collect_details(&mut entries);
        }
        let mut merged: Vec<String> = Vec::with_capacity(entries.len());
        for entry in entries {
            if !merged.contains(&entry) {
                merged.push(entry);
            }
        }
        self.status_details = (!merged.is_empty()).then(|| merged.join("\n"));
    }

    fn collect_details(&self, entries: &mut Vec<String>) {
        if let Some(own) = &self.own_details {
            entries.push(own.clone());
        }
        for sub_step in &self.sub_steps {
            sub_step.collect_details(entries);
        }
    }
}

impl fmt::Display for StepResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.info, self.status)?;
        if let Some(details) = &self.status_details {
            write!(f, " ({details})")?;
        }
        Ok(())
    }
}
