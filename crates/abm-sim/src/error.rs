use thiserror::Error;

use abm_choice::ChoiceError;
use abm_core::PersonId;
use abm_data::DataError;
use abm_output::OutputError;

#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Choice(#[from] ChoiceError),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Output(#[from] OutputError),

    /// The person-attribute dataset has no row for this person.
    #[error("person {0} has no person-attribute record")]
    MissingPersonData(PersonId),

    /// A required person-attribute field is absent.
    #[error("person record field {field:?} is missing")]
    MissingField { field: &'static str },

    /// A model produced an alternative the scheduler cannot interpret
    /// (bad day-pattern flags, unknown mode name, off-grid time, …).
    #[error("decision {decision:?} produced unparseable choice {chosen:?}")]
    BadChoice {
        decision: &'static str,
        chosen:   String,
    },

    /// A tour's synthesized start/end came out inconsistent.  Logged at the
    /// tour; the tour is kept but its window blocking is skipped.
    #[error("tour start/end inconsistent: start {start}, end {end}")]
    InvalidTimeWindow { start: f64, end: f64 },

    #[error("scheduler invariant violated: {0}")]
    Invariant(&'static str),
}

impl SimError {
    /// Short kind label for discard accounting and the run summary.
    pub fn kind(&self) -> &'static str {
        match self {
            SimError::Choice(ChoiceError::ModelDefinition(_)) => "ModelDefinition",
            SimError::Choice(ChoiceError::FormulaEvaluation { .. }) => "FormulaEvaluation",
            SimError::Choice(ChoiceError::NoAvailableAlternative) => "NoAvailableAlternative",
            SimError::Choice(ChoiceError::TypeCoercion { .. }) => "TypeCoercion",
            SimError::Choice(ChoiceError::Numeric(_)) => "Numeric",
            SimError::Choice(ChoiceError::Io(_)) | SimError::Output(_) => "Io",
            SimError::Data(_) => "Data",
            SimError::MissingPersonData(_) | SimError::MissingField { .. } => "MissingInput",
            SimError::BadChoice { .. } => "BadChoice",
            SimError::InvalidTimeWindow { .. } => "InvalidTimeWindow",
            SimError::Invariant(_) => "Invariant",
        }
    }

    /// `true` for errors that must abort the whole run instead of discarding
    /// one person — a broken model definition corrupts everybody.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SimError::Choice(ChoiceError::ModelDefinition(_)))
    }
}

pub type SimResult<T> = Result<T, SimError>;
