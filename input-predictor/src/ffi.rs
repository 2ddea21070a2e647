//! C ABI for the game engine's scripting hook.
//!
//! Labels are written into caller-owned buffers as NUL-terminated UTF-8.
//! Functions return the label length in bytes, or a negative status code.

use std::ffi::{c_char, c_int, CStr};
use std::ptr;
use std::sync::{Arc, Mutex, Once, PoisonError};

use crate::error::Result;
use crate::predictor::InputPredictor;
use crate::settings::Settings;

pub const STATUS_NULL_ARGUMENT: c_int = -1;
pub const STATUS_PREDICTION_FAILED: c_int = -2;
pub const STATUS_BUFFER_TOO_SMALL: c_int = -3;
pub const STATUS_MODEL_UNAVAILABLE: c_int = -4;

static CACHED_PREDICTOR: Mutex<Option<Arc<InputPredictor>>> = Mutex::new(None);
static LOGGING: Once = Once::new();

fn init_logging() {
    LOGGING.call_once(|| {
        let level = Settings::new().map(|s| s.logger.level).unwrap_or_else(|_| "info".into());
        crate::logging::init(&level);
    });
}

/// Loads the model at `path`. Returns null if the path is null, not UTF-8, or
/// the model cannot be read. Release the handle with [`input_predictor_free`].
///
/// # Safety
/// `path` must be null or point to a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn input_predictor_open(path: *const c_char) -> *mut InputPredictor {
    init_logging();
    if path.is_null() {
        return ptr::null_mut();
    }

    let path = match CStr::from_ptr(path).to_str() {
        Ok(path) => path,
        Err(e) => {
            tracing::error!("model path is not valid UTF-8: {}", e);
            return ptr::null_mut();
        },
    };

    match InputPredictor::load(path) {
        Ok(predictor) => Box::into_raw(Box::new(predictor)),
        Err(e) => {
            tracing::error!("failed to load model {}: {}", path, e);
            ptr::null_mut()
        },
    }
}

/// # Safety
/// `handle` must come from [`input_predictor_open`] and not be freed yet.
/// `out` must be valid for `out_len` bytes.
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn input_predictor_predict(
    handle: *const InputPredictor,
    timestamp: f64,
    x: f64,
    y: f64,
    z: f64,
    frame: u64,
    out: *mut c_char,
    out_len: usize,
) -> c_int {
    if handle.is_null() || out.is_null() {
        return STATUS_NULL_ARGUMENT;
    }

    predict_into(&*handle, timestamp, x, y, z, frame, out, out_len)
}

/// # Safety
/// `handle` must be null or come from [`input_predictor_open`], and must not
/// be used afterwards.
#[no_mangle]
pub unsafe extern "C" fn input_predictor_free(handle: *mut InputPredictor) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

/// Predicts with the model named by the settings' `paths.model`. The model is
/// loaded on first use and kept for the life of the process; a failed load is
/// retried on the next call.
///
/// # Safety
/// `out` must be valid for `out_len` bytes.
#[no_mangle]
pub unsafe extern "C" fn get_prediction(
    timestamp: f64,
    x: f64,
    y: f64,
    z: f64,
    frame: u64,
    out: *mut c_char,
    out_len: usize,
) -> c_int {
    init_logging();
    if out.is_null() {
        return STATUS_NULL_ARGUMENT;
    }

    let predictor = match cached_predictor() {
        Ok(predictor) => predictor,
        Err(e) => {
            tracing::error!("model unavailable: {}", e);
            return STATUS_MODEL_UNAVAILABLE;
        },
    };

    predict_into(&predictor, timestamp, x, y, z, frame, out, out_len)
}

fn cached_predictor() -> Result<Arc<InputPredictor>> {
    let mut cached = CACHED_PREDICTOR.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(predictor) = cached.as_ref() {
        return Ok(Arc::clone(predictor));
    }

    let settings = Settings::new()?;
    let predictor = Arc::new(InputPredictor::load(&settings.paths.model)?);
    *cached = Some(Arc::clone(&predictor));

    Ok(predictor)
}

#[allow(clippy::too_many_arguments)]
unsafe fn predict_into(
    predictor: &InputPredictor,
    timestamp: f64,
    x: f64,
    y: f64,
    z: f64,
    frame: u64,
    out: *mut c_char,
    out_len: usize,
) -> c_int {
    match predictor.predict_input(timestamp, x, y, z, frame) {
        Ok(label) => write_label(label, out, out_len),
        Err(e) => {
            tracing::error!("prediction failed: {}", e);
            STATUS_PREDICTION_FAILED
        },
    }
}

unsafe fn write_label(label: &str, out: *mut c_char, out_len: usize) -> c_int {
    let bytes = label.as_bytes();
    if bytes.len() >= out_len || bytes.len() > c_int::MAX as usize {
        return STATUS_BUFFER_TOO_SMALL;
    }

    ptr::copy_nonoverlapping(bytes.as_ptr().cast::<c_char>(), out, bytes.len());
    *out.add(bytes.len()) = 0;

    bytes.len() as c_int
}
