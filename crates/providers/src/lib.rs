//! Generation and embedding backends for Ragline.
//!
//! Generation backends implement `ragline_core::Provider`; embedding
//! backends implement `ragline_core::Embedder`. The router builds both from
//! configuration.

pub mod gemini;
pub mod huggingface;
pub mod openai_compat;
pub mod router;

pub use gemini::GeminiProvider;
pub use huggingface::HuggingFaceEmbedder;
pub use openai_compat::OpenAiCompatProvider;
pub use router::{build_embedder, build_from_config, build_generator};

use ragline_core::error::ProviderError;

/// Map a non-success HTTP status from a generation backend to a typed error.
pub(crate) fn status_to_error(status: u16, body: String) -> ProviderError {
    match status {
        429 => ProviderError::RateLimited {
            retry_after_secs: 60,
        },
        401 | 403 => ProviderError::AuthenticationFailed(body),
        _ => ProviderError::ApiError {
            status_code: status,
            message: body,
        },
    }
}
