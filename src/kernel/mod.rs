//! Instrumented units of work.
//!
//! # Data Flow
//! ```text
//! InputSource::next_input()
//!     → invoke.rs (child span, limit policy, error classification)
//!     → Kernel::run()
//!     → span closed on every exit path
//! ```

pub mod fibonacci;
pub mod input;
pub mod invoke;

pub use fibonacci::Fibonacci;
pub use input::{FixedInput, InputSource, RandomInput, SequenceInput};
pub use invoke::{invoke, LimitPolicy, LIMIT_EXCEPTION_MESSAGE, LIMIT_EXCEPTION_TYPE, LIMIT_STATUS};

use crate::error::KernelError;

/// A synchronous computation wrapped in its own span.
pub trait Kernel: Send + Sync {
    /// Name of the span opened around [`Kernel::run`].
    fn span_name(&self) -> &'static str;

    fn run(&self, input: u64) -> Result<u64, KernelError>;
}
