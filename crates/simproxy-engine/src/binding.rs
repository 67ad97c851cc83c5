//! ---
//! sp_section: "02-engine-binding"
//! sp_subsection: "module"
//! sp_type: "source"
//! sp_scope: "code"
//! sp_description: "Engine interface and dynamic module binding."
//! sp_version: "v0.0.0-prealpha"
//! sp_owner: "tbd"
//! ---
use std::ffi::CString;
use std::path::{Path, PathBuf};

use libloading::Library;
use simproxy_common::{EngineConfig, Signal, Status};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::ffi::{self, symbols};
use crate::platform::module_path;
use crate::InnerEngine;

pub type Result<T> = std::result::Result<T, BindingError>;

/// Failures while binding an inner engine module.
///
/// All of these are construction-time and fatal: the caller never
/// observes a partially bound engine. Resources acquired before the
/// failing stage are released before the error propagates.
#[derive(Debug, Error)]
pub enum BindingError {
    #[error("failed to load engine module {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },
    #[error("engine module is missing required entry point {name}: {source}")]
    MissingSymbol {
        name: &'static str,
        #[source]
        source: libloading::Error,
    },
    #[error("inner engine {name} returned a null instance handle")]
    Instantiation { name: String },
    #[error("{what} contains an interior NUL byte")]
    InvalidArgument {
        what: &'static str,
        #[source]
        source: std::ffi::NulError,
    },
}

/// Resolved entry points of a loaded engine module.
///
/// The table is resolved completely before any call is made and is
/// immutable afterwards, so lifecycle code never deals with optional
/// function pointers. The pointers stay valid for as long as the
/// owning [`Library`] is loaded; [`EngineBinding`] guarantees that by
/// holding both.
pub struct FunctionTable {
    pub(crate) instantiate: ffi::InstantiateFn,
    pub(crate) free_instance: ffi::FreeInstanceFn,
    pub(crate) setup_experiment: ffi::SetupExperimentFn,
    pub(crate) enter_initialization: ffi::EnterInitializationFn,
    pub(crate) exit_initialization: ffi::ExitInitializationFn,
    pub(crate) terminate: ffi::TerminateFn,
    pub(crate) reset: ffi::ResetFn,
    pub(crate) get_real: ffi::GetRealFn,
    pub(crate) set_real: ffi::SetRealFn,
    pub(crate) do_step: ffi::DoStepFn,
}

impl FunctionTable {
    /// Resolve every required entry point, failing on the first missing
    /// symbol and naming it.
    ///
    /// # Safety
    /// The caller must keep `library` loaded for as long as the
    /// returned table is used.
    pub unsafe fn resolve(library: &Library) -> Result<Self> {
        Ok(Self {
            instantiate: resolve_symbol(library, symbols::INSTANTIATE)?,
            free_instance: resolve_symbol(library, symbols::FREE_INSTANCE)?,
            setup_experiment: resolve_symbol(library, symbols::SETUP_EXPERIMENT)?,
            enter_initialization: resolve_symbol(library, symbols::ENTER_INITIALIZATION)?,
            exit_initialization: resolve_symbol(library, symbols::EXIT_INITIALIZATION)?,
            terminate: resolve_symbol(library, symbols::TERMINATE)?,
            reset: resolve_symbol(library, symbols::RESET)?,
            get_real: resolve_symbol(library, symbols::GET_REAL)?,
            set_real: resolve_symbol(library, symbols::SET_REAL)?,
            do_step: resolve_symbol(library, symbols::DO_STEP)?,
        })
    }
}

unsafe fn resolve_symbol<T: Copy>(library: &Library, name: &'static str) -> Result<T> {
    let symbol = library
        .get::<T>(name.as_bytes())
        .map_err(|source| BindingError::MissingSymbol { name, source })?;
    Ok(*symbol)
}

/// Inputs needed to locate and instantiate an inner engine.
#[derive(Debug, Clone, Copy)]
pub struct BindOptions<'a> {
    /// Normalized filesystem path of the resource root.
    pub resource_dir: &'a Path,
    /// Original resource URI, forwarded to the inner engine so it can
    /// find its own resource directory.
    pub resource_uri: &'a str,
    /// Engine identity and instantiation flags.
    pub engine: &'a EngineConfig,
}

/// An inner engine bound from a dynamically loaded module.
///
/// Construction is all-or-nothing: load, resolve-all, instantiate. A
/// failure at any stage drops the already-loaded [`Library`], which
/// unloads the module exactly once, and no binding value escapes.
/// After construction the instance handle is guaranteed non-null.
pub struct EngineBinding {
    table: FunctionTable,
    instance: ffi::RawInstance,
    inner_name: String,
    path: PathBuf,
    // Keeps the module mapped; the function table borrows from it.
    library: Library,
}

impl EngineBinding {
    pub fn new(options: &BindOptions<'_>) -> Result<Self> {
        let path = module_path(
            options.resource_dir,
            &options.engine.name,
            &options.engine.module,
        );
        debug!(module = %path.display(), "loading inner engine module");
        let library = unsafe { Library::new(&path) }.map_err(|source| BindingError::Load {
            path: path.clone(),
            source,
        })?;

        // From here on, any early return drops `library` and unloads the
        // module before the error reaches the caller.
        let table = unsafe { FunctionTable::resolve(&library) }?;

        let inner_name = format!("inner{}", options.engine.name);
        let name_c = cstring("instance name", &inner_name)?;
        let guid_c = cstring("engine guid", &options.engine.guid)?;
        let inner_resource_uri =
            format!("{}/{}/resources", options.resource_uri, options.engine.name);
        let resource_c = cstring("resource uri", &inner_resource_uri)?;

        let instance = unsafe {
            (table.instantiate)(
                name_c.as_ptr(),
                ffi::COSIMULATION,
                guid_c.as_ptr(),
                resource_c.as_ptr(),
                std::ptr::null(),
                ffi::bool_to_raw(options.engine.visible),
                ffi::bool_to_raw(options.engine.logging_on),
            )
        };
        if instance.is_null() {
            return Err(BindingError::Instantiation { name: inner_name });
        }

        info!(module = %path.display(), instance = %inner_name, "inner engine instantiated");
        Ok(Self {
            table,
            instance,
            inner_name,
            path,
            library,
        })
    }

    /// Path of the loaded module.
    pub fn module(&self) -> &Path {
        &self.path
    }

    /// Instance name handed to the inner engine.
    pub fn inner_name(&self) -> &str {
        &self.inner_name
    }

    fn set_real(&mut self, signal: Signal, value: f64) -> Status {
        let vr = signal.value_reference();
        let raw = unsafe { (self.table.set_real)(self.instance, &vr, 1, &value) };
        Status::from_raw(raw)
    }

    fn get_real(&mut self, signal: Signal) -> (Status, f64) {
        let vr = signal.value_reference();
        let mut value = 0.0_f64;
        let raw = unsafe { (self.table.get_real)(self.instance, &vr, 1, &mut value) };
        (Status::from_raw(raw), value)
    }
}

impl InnerEngine for EngineBinding {
    fn setup_experiment(
        &mut self,
        tolerance: Option<f64>,
        start: f64,
        stop: Option<f64>,
    ) -> Status {
        let raw = unsafe {
            (self.table.setup_experiment)(
                self.instance,
                ffi::bool_to_raw(tolerance.is_some()),
                tolerance.unwrap_or(0.0),
                start,
                ffi::bool_to_raw(stop.is_some()),
                stop.unwrap_or(0.0),
            )
        };
        Status::from_raw(raw)
    }

    fn enter_initialization(&mut self) -> Status {
        Status::from_raw(unsafe { (self.table.enter_initialization)(self.instance) })
    }

    fn exit_initialization(&mut self) -> Status {
        Status::from_raw(unsafe { (self.table.exit_initialization)(self.instance) })
    }

    fn set_signal(&mut self, signal: Signal, value: f64) -> Status {
        self.set_real(signal, value)
    }

    fn read_signal(&mut self, signal: Signal) -> (Status, f64) {
        self.get_real(signal)
    }

    fn step(&mut self, time: f64, step_size: f64, no_set_prior: bool) -> Status {
        let raw = unsafe {
            (self.table.do_step)(self.instance, time, step_size, ffi::bool_to_raw(no_set_prior))
        };
        Status::from_raw(raw)
    }

    fn terminate(&mut self) -> Status {
        Status::from_raw(unsafe { (self.table.terminate)(self.instance) })
    }

    fn reset(&mut self) -> Status {
        Status::from_raw(unsafe { (self.table.reset)(self.instance) })
    }
}

impl Drop for EngineBinding {
    fn drop(&mut self) {
        // Best-effort teardown; a failing terminate must not block
        // freeing the instance or unloading the module.
        let status = Status::from_raw(unsafe { (self.table.terminate)(self.instance) });
        if !status.is_ok() {
            warn!(instance = %self.inner_name, %status, "inner engine terminate failed during teardown");
        }
        unsafe { (self.table.free_instance)(self.instance) };
        debug!(module = %self.path.display(), "unloading inner engine module");
    }
}

fn cstring(what: &'static str, value: &str) -> Result<CString> {
    CString::new(value).map_err(|source| BindingError::InvalidArgument { what, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn options<'a>(resource_dir: &'a Path, engine: &'a EngineConfig) -> BindOptions<'a> {
        BindOptions {
            resource_dir,
            resource_uri: "file:///tmp/resources",
            engine,
        }
    }

    #[test]
    fn missing_module_fails_to_load() {
        let engine = EngineConfig::default();
        let dir = tempfile::tempdir().expect("tempdir");
        let err = EngineBinding::new(&options(dir.path(), &engine))
            .err()
            .expect("construction must fail");
        match err {
            BindingError::Load { path, .. } => {
                assert_eq!(path, module_path(dir.path(), &engine.name, &engine.module));
            }
            other => panic!("expected Load error, got {other}"),
        }
    }

    #[test]
    fn non_library_file_fails_to_load() {
        let engine = EngineConfig::default();
        let dir = tempfile::tempdir().expect("tempdir");
        let module = module_path(dir.path(), &engine.name, &engine.module);
        std::fs::create_dir_all(module.parent().expect("parent")).expect("mkdirs");
        let mut file = std::fs::File::create(&module).expect("create bogus module");
        file.write_all(b"definitely not a shared object").expect("write");
        drop(file);

        let err = EngineBinding::new(&options(dir.path(), &engine))
            .err()
            .expect("construction must fail");
        assert!(matches!(err, BindingError::Load { .. }));
    }

    #[test]
    fn errors_name_the_missing_symbol() {
        let err = BindingError::MissingSymbol {
            name: symbols::DO_STEP,
            source: libloading::Error::DlSymUnknown,
        };
        assert!(err.to_string().contains("fmi2DoStep"));
    }
}
