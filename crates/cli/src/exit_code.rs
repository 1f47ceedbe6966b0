// Consistent exit codes for the donelist CLI.
//
//   0  = success
//   1  = general error
//   2  = usage/argument error
//   11 = authentication or permission error
//   12 = todo not found
//   13 = network error

use std::process;

use donelist_client::config::ConfigError;
use donelist_common::error::MutationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    Error = 1,
    Usage = 2,
    Auth = 11,
    NotFound = 12,
    Network = 13,
}

impl ExitCode {
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Map an anyhow error to an exit code by inspecting the error chain.
    pub fn from_error(err: &anyhow::Error) -> Self {
        for cause in err.chain() {
            if let Some(mutation) = cause.downcast_ref::<MutationError>() {
                return Self::from_mutation_error(mutation);
            }
            if cause.downcast_ref::<ConfigError>().is_some() {
                return Self::Usage;
            }
        }
        Self::Error
    }

    pub fn from_mutation_error(error: &MutationError) -> Self {
        match error {
            MutationError::Unauthenticated | MutationError::Forbidden => Self::Auth,
            MutationError::ValidationFailed(_) => Self::Usage,
            MutationError::NotFoundOrForbidden => Self::NotFound,
            MutationError::NetworkOrTimeout(_) => Self::Network,
        }
    }
}

impl From<ExitCode> for process::ExitCode {
    fn from(code: ExitCode) -> Self {
        process::ExitCode::from(code.code() as u8)
    }
}
