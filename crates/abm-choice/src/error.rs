use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChoiceError {
    /// Malformed or incomplete model definition.  Models are shared by every
    /// person in the run, so this is fatal: it aborts the whole run.
    #[error("model definition error: {0}")]
    ModelDefinition(String),

    /// A utility formula referenced a name bound neither as a parameter nor
    /// as a variable, or otherwise failed to evaluate.
    #[error("utility formula for {alternative:?} failed ({reason}): {formula}")]
    FormulaEvaluation {
        alternative: String,
        formula:     String,
        reason:      String,
    },

    /// Every alternative was unavailable when a draw was requested.
    #[error("no available alternative to sample")]
    NoAvailableAlternative,

    /// An input-record field exists but cannot be read as a number.
    #[error("field {field:?} is not numeric")]
    TypeCoercion { field: String },

    /// Overflow or domain error in the decimal exp/ln/pow chain.
    #[error("numeric range error computing {0}")]
    Numeric(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ChoiceResult<T> = Result<T, ChoiceError>;
