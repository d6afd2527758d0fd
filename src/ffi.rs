//! FFI bindings for the cohort engine
//!
//! This module provides C-compatible functions for computing reports from other
//! languages. All functions use C strings (null-terminated) and return allocated
//! memory that must be freed by the caller using `cohort_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::config::MetricsConfig;
use crate::error::ComputeError;
use crate::pipeline::{events_to_report_json, MetricsEngine};
use crate::schema::EventAdapter;

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Hand a result back across the boundary, recording the error on failure
fn return_json(result: Result<String, ComputeError>) -> *mut c_char {
    match result {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Optional config: NULL means defaults, anything else must be valid UTF-8 JSON
unsafe fn optional_config(config_json: *const c_char) -> Result<Option<String>, ()> {
    if config_json.is_null() {
        return Ok(None);
    }
    match cstr_to_string(config_json) {
        Some(s) => Ok(Some(s)),
        None => {
            set_last_error("Invalid config string pointer");
            Err(())
        }
    }
}

// ============================================================================
// Stateless API
// ============================================================================

/// Compute an analytics report from event JSON (array or NDJSON).
///
/// # Safety
/// - `events_json` must be a valid null-terminated C string.
/// - `config_json` may be NULL (defaults) or a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `cohort_free_string`.
/// - Returns NULL on error; call `cohort_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn cohort_report_json(
    events_json: *const c_char,
    config_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let events = match cstr_to_string(events_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid events string pointer");
            return ptr::null_mut();
        }
    };

    let Ok(config) = optional_config(config_json) else {
        return ptr::null_mut();
    };

    return_json(events_to_report_json(events, config))
}

/// Get the default configuration as JSON.
///
/// # Safety
/// - Returns a newly allocated string that must be freed with `cohort_free_string`.
#[no_mangle]
pub unsafe extern "C" fn cohort_default_config_json() -> *mut c_char {
    clear_last_error();
    return_json(MetricsConfig::default().to_json())
}

// ============================================================================
// Engine API
// ============================================================================

/// Opaque handle to a MetricsEngine
pub struct CohortEngineHandle {
    engine: MetricsEngine,
}

/// Create an engine bound to one configuration.
///
/// # Safety
/// - `config_json` may be NULL (defaults) or a valid null-terminated C string.
/// - Must be freed with `cohort_engine_free`.
/// - Returns NULL on error; call `cohort_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn cohort_engine_new(config_json: *const c_char) -> *mut CohortEngineHandle {
    clear_last_error();

    let Ok(config_json) = optional_config(config_json) else {
        return ptr::null_mut();
    };

    let engine = config_json
        .as_deref()
        .map_or_else(|| Ok(MetricsConfig::default()), MetricsConfig::from_json)
        .and_then(MetricsEngine::new);

    match engine {
        Ok(engine) => Box::into_raw(Box::new(CohortEngineHandle { engine })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free an engine.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `cohort_engine_new`.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn cohort_engine_free(engine: *mut CohortEngineHandle) {
    if !engine.is_null() {
        drop(Box::from_raw(engine));
    }
}

/// Compute a report with an existing engine.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `cohort_engine_new`.
/// - `events_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `cohort_free_string`.
/// - Returns NULL on error; call `cohort_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn cohort_engine_report(
    engine: *const CohortEngineHandle,
    events_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return ptr::null_mut();
    }

    let handle = &*engine;

    let events = match cstr_to_string(events_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid events string pointer");
            return ptr::null_mut();
        }
    };

    let result = EventAdapter::parse_auto(&events)
        .and_then(|records| EventAdapter::to_table(&records))
        .and_then(|table| handle.engine.report_to_json(&table));
    return_json(result)
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by cohort functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a cohort function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn cohort_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next cohort function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn cohort_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn cohort_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
