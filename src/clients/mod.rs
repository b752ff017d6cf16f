pub mod gemini;
pub mod response;
pub mod traits;

pub use gemini::GeminiInvoker;
pub use response::{ClientAttemptOutcome, ModelReply, ResponseClient};
pub use traits::{InvokeError, ModelInvoker};
