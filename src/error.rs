use crate::domain::ParamsError;
use crate::fit::FitError;
use crate::symbolic::ExprError;

/// Exit code for invalid input, configuration, or file I/O.
pub const EXIT_INPUT: u8 = 2;
/// Exit code when no usable measurements remain.
pub const EXIT_NO_DATA: u8 = 3;
/// Exit code for numerical failures (evaluation, fitting).
pub const EXIT_NUMERIC: u8 = 4;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

impl From<ExprError> for AppError {
    fn from(err: ExprError) -> Self {
        AppError::new(EXIT_NUMERIC, format!("Model evaluation failed: {err}"))
    }
}

impl From<FitError> for AppError {
    fn from(err: FitError) -> Self {
        AppError::new(EXIT_NUMERIC, format!("Model fit failed: {err}"))
    }
}

impl From<ParamsError> for AppError {
    fn from(err: ParamsError) -> Self {
        AppError::new(EXIT_INPUT, format!("Invalid parameters: {err}"))
    }
}
