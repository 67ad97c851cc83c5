//! ---
//! sp_section: "02-engine-binding"
//! sp_subsection: "module"
//! sp_type: "source"
//! sp_scope: "code"
//! sp_description: "Engine interface and dynamic module binding."
//! sp_version: "v0.0.0-prealpha"
//! sp_owner: "tbd"
//! ---
//! Raw C ABI of the FMI 2.0 co-simulation interface.
//!
//! Only the closed set of entry points the proxy actually forwards is
//! declared here. The signatures must stay byte-compatible with the
//! official headers; an engine module compiled against them is loaded
//! without any Rust-side shims.

use std::os::raw::{c_char, c_int, c_uint, c_void};

/// Opaque component handle returned by `fmi2Instantiate`.
pub type RawInstance = *mut c_void;

/// Raw status discriminant as defined by the standard.
pub type RawStatus = c_int;

/// `fmi2Type` discriminant selecting co-simulation mode.
pub const COSIMULATION: c_int = 1;

/// `fmi2True` / `fmi2False`.
pub const TRUE: c_int = 1;
pub const FALSE: c_int = 0;

pub fn bool_to_raw(value: bool) -> c_int {
    if value {
        TRUE
    } else {
        FALSE
    }
}

/// Callback table passed to `fmi2Instantiate`.
///
/// The proxy instantiates engines with a null callback pointer; the
/// struct is declared so the instantiate signature stays faithful and a
/// future host can forward real callbacks.
#[repr(C)]
pub struct EngineCallbacks {
    pub logger: Option<
        unsafe extern "C" fn(
            component_environment: *mut c_void,
            instance_name: *const c_char,
            status: RawStatus,
            category: *const c_char,
            message: *const c_char,
        ),
    >,
    pub allocate_memory: Option<unsafe extern "C" fn(nobj: usize, size: usize) -> *mut c_void>,
    pub free_memory: Option<unsafe extern "C" fn(obj: *mut c_void)>,
    pub step_finished: Option<
        unsafe extern "C" fn(component_environment: *mut c_void, status: RawStatus),
    >,
    pub component_environment: *mut c_void,
}

pub type InstantiateFn = unsafe extern "C" fn(
    instance_name: *const c_char,
    engine_type: c_int,
    guid: *const c_char,
    resource_location: *const c_char,
    callbacks: *const EngineCallbacks,
    visible: c_int,
    logging_on: c_int,
) -> RawInstance;

pub type FreeInstanceFn = unsafe extern "C" fn(instance: RawInstance);

pub type SetupExperimentFn = unsafe extern "C" fn(
    instance: RawInstance,
    tolerance_defined: c_int,
    tolerance: f64,
    start_time: f64,
    stop_time_defined: c_int,
    stop_time: f64,
) -> RawStatus;

pub type EnterInitializationFn = unsafe extern "C" fn(instance: RawInstance) -> RawStatus;
pub type ExitInitializationFn = unsafe extern "C" fn(instance: RawInstance) -> RawStatus;
pub type TerminateFn = unsafe extern "C" fn(instance: RawInstance) -> RawStatus;
pub type ResetFn = unsafe extern "C" fn(instance: RawInstance) -> RawStatus;

pub type GetRealFn = unsafe extern "C" fn(
    instance: RawInstance,
    value_references: *const c_uint,
    count: usize,
    values: *mut f64,
) -> RawStatus;

pub type SetRealFn = unsafe extern "C" fn(
    instance: RawInstance,
    value_references: *const c_uint,
    count: usize,
    values: *const f64,
) -> RawStatus;

pub type DoStepFn = unsafe extern "C" fn(
    instance: RawInstance,
    current_communication_point: f64,
    communication_step_size: f64,
    no_set_prior_state: c_int,
) -> RawStatus;

/// Export names of the required entry points.
pub mod symbols {
    pub const INSTANTIATE: &str = "fmi2Instantiate";
    pub const FREE_INSTANCE: &str = "fmi2FreeInstance";
    pub const SETUP_EXPERIMENT: &str = "fmi2SetupExperiment";
    pub const ENTER_INITIALIZATION: &str = "fmi2EnterInitializationMode";
    pub const EXIT_INITIALIZATION: &str = "fmi2ExitInitializationMode";
    pub const TERMINATE: &str = "fmi2Terminate";
    pub const RESET: &str = "fmi2Reset";
    pub const GET_REAL: &str = "fmi2GetReal";
    pub const SET_REAL: &str = "fmi2SetReal";
    pub const DO_STEP: &str = "fmi2DoStep";
}
