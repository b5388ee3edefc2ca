pub mod client;
pub mod prompt;
pub mod sanitize;

pub use client::{CompletionBackend, GeminiClient};
pub use prompt::build_prompt;
pub use sanitize::{sanitize, strip_code_fence};
