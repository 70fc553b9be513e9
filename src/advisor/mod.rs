//! Advisory pipeline: prompt composition, model request, response parsing.
//!
//! Providers are dispatched through [`request_advisory`]; adding a vendor
//! means a new module here plus a variant in
//! [`crate::config::AdvisoryProvider`].

pub mod openai;
pub mod parsing;
pub mod prompts;
pub mod types;

pub use parsing::parse_advisory;
pub use prompts::build_advisory_prompt;
pub use types::{Advisory, AdvisorError, AdvisorErrorKind, AdvisoryResponse, StockPick};

use crate::config::{AdvisorConfig, AdvisoryProvider};

/// Send a composed prompt to the configured provider.
pub async fn request_advisory(
    config: &AdvisorConfig,
    prompt: &str,
) -> Result<AdvisoryResponse, AdvisorError> {
    match config.provider {
        AdvisoryProvider::OpenAi => openai::advise(config, prompt).await,
    }
}
