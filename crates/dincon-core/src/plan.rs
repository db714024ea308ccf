//! Task plans produced by the model
//!
//! A plan is a JSON array of steps persisted next to the project manifest.
//! Steps are addressed 1-indexed by position.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

use crate::error::{DinconError, Result};

/// What a step's `value` holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepType {
    Code,
    Command,
    Description,
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepType::Code => write!(f, "code"),
            StepType::Command => write!(f, "command"),
            StepType::Description => write!(f, "description"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    #[serde(rename = "stepNumber")]
    pub step_number: u32,
    pub summary: String,
    #[serde(rename = "type")]
    pub step_type: StepType,
    pub value: String,
    /// Fields the model added beyond the schema, kept for re-serialization
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Plan {
    pub steps: Vec<Step>,
}

impl Plan {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Look up a step by its 1-based position
    pub fn get_step(&self, n: i64) -> Result<&Step> {
        let out_of_range = || DinconError::StepOutOfRange {
            requested: n,
            len: self.steps.len(),
        };

        let index = usize::try_from(n)
            .ok()
            .and_then(|n| n.checked_sub(1))
            .ok_or_else(out_of_range)?;

        self.steps.get(index).ok_or_else(out_of_range)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Parse the model's raw text into a plan
pub fn create_plan(raw_model_output: &str) -> Result<Plan> {
    let body = strip_code_fence(raw_model_output);

    let plan: Plan = serde_json::from_str(body).map_err(|e| {
        warn!(error = %e, "Model response is not a valid plan");
        DinconError::PlanDecode(e)
    })?;

    for (i, step) in plan.steps.iter().enumerate() {
        if step.step_number as usize != i + 1 {
            debug!(
                position = i + 1,
                step_number = step.step_number,
                "stepNumber does not match position"
            );
        }
    }

    Ok(plan)
}

/// Unwrap a response wrapped in a single markdown code fence
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };

    // Drop the info string (```json)
    match body.split_once('\n') {
        Some((_, inner)) => inner.trim(),
        None => body.trim(),
    }
}

/// Prompt asking the model to decompose a task into plan steps
pub fn plan_prompt(task: &str) -> String {
    format!(
        "Break down the following task into atomic actionable steps: \"{task}\". \
         Provide the output as a JSON array, where each element is an object with the fields \
         \"stepNumber\" (integer, starting at 1), \"summary\", \"type\" and \"value\". \
         \"type\" must be one of code, command or description, and \"value\" must be the \
         actual code, command or description. \
         I do not want a text description, only the JSON array."
    )
}

/// Prompt asking the model to implement one step
pub fn execute_prompt(step: &Step) -> String {
    format!(
        "Implement the following task: {summary}. \
         The planned {kind} for this step is:\n{value}\n\
         Provide the necessary code changes as a series of file edits.",
        summary = step.summary,
        kind = step.step_type,
        value = step.value,
    )
}
