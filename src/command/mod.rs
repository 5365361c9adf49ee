//! Typed command templates for the speech and power chains.
//!
//! A chain is stored in the state file as a list of argv lists. Each stage
//! may mark at most one argument with the literal token `"{}"`; rendering a
//! chain substitutes a value into that slot. The token is resolved once at
//! parse time, not string-matched on every invocation.

pub mod pipeline;

use tracing::warn;

/// The argument token that marks the substitution slot.
pub const PLACEHOLDER: &str = "{}";

#[derive(Debug, Clone, PartialEq, Eq)]
enum TemplateArg {
    Literal(String),
    Placeholder,
}

/// One pipeline stage: a program plus arguments with an optional
/// substitution slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    program: String,
    args: Vec<TemplateArg>,
}

impl CommandTemplate {
    /// Parse an argv list. Returns `None` for an empty list.
    ///
    /// The first `"{}"` argument becomes the slot; any later occurrence
    /// stays a literal.
    pub fn parse(argv: &[String]) -> Option<Self> {
        let (program, rest) = argv.split_first()?;

        let mut slot_taken = false;
        let args = rest
            .iter()
            .map(|arg| {
                if !slot_taken && arg == PLACEHOLDER {
                    slot_taken = true;
                    TemplateArg::Placeholder
                } else {
                    TemplateArg::Literal(arg.clone())
                }
            })
            .collect();

        Some(Self {
            program: program.clone(),
            args,
        })
    }

    /// Render the stage into an argv list, substituting `value` into the
    /// slot if the template has one.
    pub fn render(&self, value: &str) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.args.len() + 1);
        argv.push(self.program.clone());
        for arg in &self.args {
            match arg {
                TemplateArg::Literal(text) => argv.push(text.clone()),
                TemplateArg::Placeholder => argv.push(value.to_string()),
            }
        }
        argv
    }
}

/// An ordered chain of command templates, executed as one pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandChain {
    stages: Vec<CommandTemplate>,
}

impl CommandChain {
    /// Parse the stored argv lists into a chain. Empty stages are skipped
    /// with a warning.
    pub fn parse(stages: &[Vec<String>]) -> Self {
        let stages = stages
            .iter()
            .enumerate()
            .filter_map(|(index, argv)| match CommandTemplate::parse(argv) {
                Some(template) => Some(template),
                None => {
                    warn!(stage = index, "Ignoring empty command stage");
                    None
                }
            })
            .collect();
        Self { stages }
    }

    /// True when no commands are configured. Callers skip the pipeline
    /// entirely in that case.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Render every stage with `value` substituted into its slot.
    pub fn render(&self, value: &str) -> Vec<Vec<String>> {
        self.stages.iter().map(|stage| stage.render(value)).collect()
    }
}
