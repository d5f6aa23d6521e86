//! Process-wide foreign runtime registry.
//!
//! A process talks to at most one foreign runtime. It is installed once with
//! [`install`], together with the designated [`ForeignThread`] on which every
//! foreign call runs, and is never replaced afterwards. Until a runtime is
//! installed, every foreign capability fails with
//! [`EstimatorError::MissingBackend`].
//!
//! Modules that the native side re-implements (model selection, grid search,
//! pipelines) are refused by [`import`] with [`EstimatorError::NativeModule`].

use crate::config::EcosystemConfig;
use crate::error::EstimatorError;
use crate::foreign::{ForeignRuntime, ForeignValue};
use crate::thread::ForeignThread;
use std::sync::{Arc, OnceLock};
use std::thread::ThreadId;
use tracing::{debug, info};

/// Name of the designated foreign thread.
pub const FOREIGN_THREAD_NAME: &str = "lex-foreign";

/// Foreign submodules provided natively, with the native replacement named
/// in the error.
const TRANSLATED_MODULES: [(&str, &str); 4] = [
    ("model_selection", "model selection utilities"),
    ("cross_validation", "cross-validation utilities"),
    ("grid_search", "grid search"),
    ("pipeline", "Pipeline composite"),
];

struct Registered {
    runtime: Arc<dyn ForeignRuntime>,
    thread: ForeignThread,
}

static REGISTRY: OnceLock<Registered> = OnceLock::new();

/// Install the process-wide foreign runtime and spawn its thread.
///
/// # Errors
///
/// [`EstimatorError::RuntimeInit`] if a runtime is already installed;
/// [`EstimatorError::Io`] if the thread cannot be spawned.
pub fn install(runtime: Arc<dyn ForeignRuntime>) -> Result<(), EstimatorError> {
    if REGISTRY.get().is_some() {
        return Err(already_installed());
    }

    let name = runtime.config().name.clone();
    let thread = ForeignThread::spawn(FOREIGN_THREAD_NAME)?;

    REGISTRY
        .set(Registered { runtime, thread })
        .map_err(|_| already_installed())?;

    info!("Installed foreign runtime for {}", name);
    Ok(())
}

fn already_installed() -> EstimatorError {
    EstimatorError::RuntimeInit("a foreign runtime is already installed".to_string())
}

fn current() -> Result<&'static Registered, EstimatorError> {
    REGISTRY.get().ok_or_else(|| {
        let config = EcosystemConfig::default();
        EstimatorError::MissingBackend {
            component: config.name,
            instructions: config.install_url,
        }
    })
}

/// Whether a foreign runtime has been installed.
#[must_use]
pub fn is_installed() -> bool {
    REGISTRY.get().is_some()
}

/// Configuration of the installed runtime.
///
/// # Errors
///
/// [`EstimatorError::MissingBackend`] if none is installed.
pub fn config() -> Result<&'static EcosystemConfig, EstimatorError> {
    Ok(current()?.runtime.config())
}

/// Id of the designated foreign thread, once a runtime is installed.
#[must_use]
pub fn foreign_thread_id() -> Option<ThreadId> {
    REGISTRY.get().map(|registered| registered.thread.thread_id())
}

/// Run `job` on the designated foreign thread and return its result.
///
/// Runs inline when already on that thread.
///
/// # Errors
///
/// [`EstimatorError::MissingBackend`] if no runtime is installed,
/// [`EstimatorError::ForeignThread`] if the job panicked, or the job's own
/// error.
pub fn on_foreign_thread<F, R>(job: F) -> Result<R, EstimatorError>
where
    F: FnOnce() -> Result<R, EstimatorError> + Send + 'static,
    R: Send + 'static,
{
    current()?.thread.run(job)?
}

/// Resolve `symbol` in the foreign `module`.
///
/// # Errors
///
/// - [`EstimatorError::NativeModule`] if `module` is provided natively
/// - [`EstimatorError::MissingBackend`] if no runtime is installed or the
///   module or symbol cannot be found
pub fn import(module: &str, symbol: &str) -> Result<ForeignValue, EstimatorError> {
    let registered = current()?;

    if let Some(replacement) = translated(&registered.runtime.config().root_module, module) {
        return Err(EstimatorError::NativeModule {
            module: module.to_string(),
            replacement: replacement.to_string(),
        });
    }

    debug!("Importing {}.{}", module, symbol);
    let runtime = Arc::clone(&registered.runtime);
    let (module, symbol) = (module.to_string(), symbol.to_string());
    registered.thread.run(move || runtime.import(&module, &symbol))?
}

fn translated(root_module: &str, module: &str) -> Option<&'static str> {
    let submodule = module.strip_prefix(root_module)?.strip_prefix('.')?;
    let first = submodule.split('.').next()?;
    TRANSLATED_MODULES
        .iter()
        .find(|(name, _)| *name == first)
        .map(|(_, replacement)| *replacement)
}
