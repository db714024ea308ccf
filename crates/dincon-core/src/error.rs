use thiserror::Error;

/// Failures a command reports to the user as a plain message.
#[derive(Debug, Error)]
pub enum DinconError {
    #[error("{0} already exists")]
    ManifestExists(String),

    #[error("No plan found. Please run 'plan' command first.")]
    PlanNotFound,

    #[error("plan file {path} is malformed: {source}")]
    PlanMalformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unable to parse the plan. Please try again. ({0})")]
    PlanDecode(#[source] serde_json::Error),

    #[error("{}", step_range_message(.requested, .len))]
    StepOutOfRange { requested: i64, len: usize },

    #[error("This is not a Git repository. {0}")]
    NotARepository(&'static str),

    #[error("Error {action}: {stderr}")]
    GitFailed {
        action: &'static str,
        stderr: String,
    },

    #[error("Aborted!")]
    Aborted,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn step_range_message(requested: &i64, len: &usize) -> String {
    if *len == 0 {
        format!("Invalid step number {requested}. The plan has no steps.")
    } else {
        format!("Invalid step number {requested}. Please choose a step between 1 and {len}.")
    }
}

impl DinconError {
    /// True for variants that describe a rejected precondition rather than a
    /// broken environment.
    pub fn is_user_facing(&self) -> bool {
        !matches!(self, DinconError::Io(_) | DinconError::Json(_))
    }
}

pub type Result<T> = std::result::Result<T, DinconError>;
