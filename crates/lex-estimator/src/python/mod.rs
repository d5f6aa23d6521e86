//! Python interop module.
//!
//! Implements the foreign boundary on top of PyO3, talking to scikit-learn
//! (or any ecosystem described by an [`EcosystemConfig`](crate::EcosystemConfig))
//! in an embedded interpreter.

pub mod conversion;
pub mod runtime;

pub use conversion::PyHandle;
pub use runtime::{PythonRuntime, initialize};
