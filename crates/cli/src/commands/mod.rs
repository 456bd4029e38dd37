//! Command handlers for the Grounded CLI.

pub mod ask;
pub mod config;
pub mod handle;

pub use ask::AskCommand;
pub use config::ConfigCommand;
pub use handle::HandleCommand;

use grounded_core::{AppError, AppResult};
use grounded_rag::HttpResponse;

/// Print the envelope to stdout and turn a non-2xx status into an error.
pub(crate) fn emit(response: &HttpResponse) -> AppResult<()> {
    println!("{}", response.body);

    if response.is_success() {
        Ok(())
    } else {
        Err(AppError::Other(format!(
            "Request failed with status {}",
            response.status
        )))
    }
}
