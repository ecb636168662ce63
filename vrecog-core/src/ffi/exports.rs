//! Exported `vrecog_*` functions
//!
//! Handles are created by the `*_new` functions and must be released with the
//! matching `*_free`. Strings returned by the recognizer stay valid until the
//! next call on the same recognizer or its release. A recognizer must not be
//! used from two threads at once; models may be shared freely.

#![allow(clippy::missing_safety_doc)]

use super::safety::{c_slice, c_str, check_null, ffi_safe_call};
use super::types::{FfiError, VRecogModel, VRecogRecognizer, VRecogSpkModel};
use crate::audio::{AudioBuffer, SampleWidth};
use crate::error::VRecogResult;
use crate::model::{Model, ModelMode, SpeakerModel, WORD_NOT_FOUND};
use crate::recognizer::RecognizerSession;
use crate::runtime::Runtime;
use std::os::raw::{c_char, c_float, c_int, c_short, c_uchar};
use std::ptr;

// ---------------------------------------------------------------------------
// Handle helpers
// ---------------------------------------------------------------------------

unsafe fn model_ref<'a>(model: *const VRecogModel) -> Result<&'a Model, FfiError> {
    check_null(model, "model")?;
    // SAFETY: non-null handle from vrecog_model_new
    Ok(unsafe { &(*model).model })
}

unsafe fn spk_model_ref<'a>(spk_model: *const VRecogSpkModel) -> Result<&'a SpeakerModel, FfiError> {
    check_null(spk_model, "spk_model")?;
    // SAFETY: non-null handle from vrecog_spk_model_new
    Ok(unsafe { &(*spk_model).model })
}

fn into_recognizer<F>(build: F) -> *mut VRecogRecognizer
where
    F: FnOnce() -> Result<RecognizerSession, FfiError>,
{
    match ffi_safe_call(build) {
        Ok(session) => Box::into_raw(Box::new(VRecogRecognizer::new(session))),
        Err(_) => ptr::null_mut(),
    }
}

/// 1 on endpoint, 0 otherwise, a negative code on error
unsafe fn accept<F>(recognizer: *mut VRecogRecognizer, feed: F) -> c_int
where
    F: FnOnce(&mut RecognizerSession) -> Result<bool, FfiError>,
{
    let result = ffi_safe_call(|| {
        check_null(recognizer, "recognizer")?;
        // SAFETY: non-null handle from a vrecog_recognizer_new* function
        let recognizer = unsafe { &mut *recognizer };
        feed(&mut recognizer.session)
    });
    match result {
        Ok(endpoint) => c_int::from(endpoint),
        Err(e) => e.code(),
    }
}

/// Run a result call and park its JSON (or the error JSON) in the handle
unsafe fn result_string<F>(recognizer: *mut VRecogRecognizer, produce: F) -> *const c_char
where
    F: FnOnce(&mut RecognizerSession) -> VRecogResult<String>,
{
    // SAFETY: null or a handle from a vrecog_recognizer_new* function
    let Some(recognizer) = (unsafe { recognizer.as_mut() }) else {
        tracing::error!("Null pointer: recognizer");
        return ptr::null();
    };

    let json = match ffi_safe_call(|| produce(&mut recognizer.session).map_err(FfiError::from)) {
        Ok(json) => json,
        Err(e) => e.to_json(),
    };
    recognizer.store_result(json).as_ptr()
}

// ---------------------------------------------------------------------------
// Models
// ---------------------------------------------------------------------------

/// Load a model directory. `mode`: 0 ASR, 1 KWS, 2 both. Returns null on
/// failure.
#[no_mangle]
pub unsafe extern "C" fn vrecog_model_new(model_path: *const c_char, mode: c_int) -> *mut VRecogModel {
    crate::init_logging();

    let result = ffi_safe_call(|| {
        let path = unsafe { c_str(model_path, "model_path") }?;
        let mode = ModelMode::from_raw(mode)?;
        Ok(Model::load(path, mode)?)
    });
    match result {
        Ok(model) => Box::into_raw(Box::new(VRecogModel { model })),
        Err(_) => ptr::null_mut(),
    }
}

/// Drop this handle's reference; resources go away with the last recognizer
#[no_mangle]
pub unsafe extern "C" fn vrecog_model_free(model: *mut VRecogModel) {
    if model.is_null() {
        return;
    }
    // SAFETY: handle from vrecog_model_new, freed once
    let handle = unsafe { Box::from_raw(model) };
    handle.model.release();
}

/// Symbol id of `word`, 0 for `<eps>`, -1 if absent
#[no_mangle]
pub unsafe extern "C" fn vrecog_model_find_word(model: *mut VRecogModel, word: *const c_char) -> c_int {
    let result = ffi_safe_call(|| {
        let model = unsafe { model_ref(model) }?;
        let word = unsafe { c_str(word, "word") }?;
        Ok(model.find_word(word).unwrap_or(WORD_NOT_FOUND))
    });
    result.unwrap_or(WORD_NOT_FOUND)
}

#[no_mangle]
pub unsafe extern "C" fn vrecog_model_check_kws_load_status(model: *mut VRecogModel) -> bool {
    ffi_safe_call(|| Ok(unsafe { model_ref(model) }?.kws_ready())).unwrap_or(false)
}

#[no_mangle]
pub unsafe extern "C" fn vrecog_model_check_asr_load_status(model: *mut VRecogModel) -> bool {
    ffi_safe_call(|| Ok(unsafe { model_ref(model) }?.asr_ready())).unwrap_or(false)
}

#[no_mangle]
pub unsafe extern "C" fn vrecog_spk_model_new(model_path: *const c_char) -> *mut VRecogSpkModel {
    crate::init_logging();

    let result = ffi_safe_call(|| {
        let path = unsafe { c_str(model_path, "model_path") }?;
        Ok(SpeakerModel::load(path)?)
    });
    match result {
        Ok(model) => Box::into_raw(Box::new(VRecogSpkModel { model })),
        Err(_) => ptr::null_mut(),
    }
}

#[no_mangle]
pub unsafe extern "C" fn vrecog_spk_model_free(spk_model: *mut VRecogSpkModel) {
    if spk_model.is_null() {
        return;
    }
    // SAFETY: handle from vrecog_spk_model_new, freed once
    let handle = unsafe { Box::from_raw(spk_model) };
    handle.model.release();
}

// ---------------------------------------------------------------------------
// Recognizers
// ---------------------------------------------------------------------------

#[no_mangle]
pub unsafe extern "C" fn vrecog_recognizer_new(
    model: *mut VRecogModel,
    sample_rate: c_float,
) -> *mut VRecogRecognizer {
    into_recognizer(|| {
        let model = unsafe { model_ref(model) }?;
        Ok(RecognizerSession::new(model, sample_rate)?)
    })
}

#[no_mangle]
pub unsafe extern "C" fn vrecog_recognizer_new_spk(
    model: *mut VRecogModel,
    spk_model: *mut VRecogSpkModel,
    sample_rate: c_float,
) -> *mut VRecogRecognizer {
    into_recognizer(|| {
        let model = unsafe { model_ref(model) }?;
        let spk_model = unsafe { spk_model_ref(spk_model) }?;
        Ok(RecognizerSession::with_speaker(model, spk_model, sample_rate)?)
    })
}

/// Keyword spotter over a JSON phrase list, e.g. `["hello system", "[unk]"]`
#[no_mangle]
pub unsafe extern "C" fn vrecog_recognizer_new_wake(
    model: *mut VRecogModel,
    sample_rate: c_float,
    grammar: *const c_char,
) -> *mut VRecogRecognizer {
    into_recognizer(|| {
        let model = unsafe { model_ref(model) }?;
        let grammar = unsafe { c_str(grammar, "grammar") }?;
        Ok(RecognizerSession::with_wake_words(model, sample_rate, grammar)?)
    })
}

/// Keyword spotter; with `do_asr` a detected phrase starts recognition
#[no_mangle]
pub unsafe extern "C" fn vrecog_recognizer_new_gram(
    model: *mut VRecogModel,
    sample_rate: c_float,
    grammar: *const c_char,
    do_asr: bool,
) -> *mut VRecogRecognizer {
    into_recognizer(|| {
        let model = unsafe { model_ref(model) }?;
        let grammar = unsafe { c_str(grammar, "grammar") }?;
        Ok(RecognizerSession::with_grammar(model, sample_rate, grammar, do_asr)?)
    })
}

#[no_mangle]
pub unsafe extern "C" fn vrecog_recognizer_new_grm_spk(
    model: *mut VRecogModel,
    spk_model: *mut VRecogSpkModel,
    sample_rate: c_float,
    grammar: *const c_char,
) -> *mut VRecogRecognizer {
    into_recognizer(|| {
        let model = unsafe { model_ref(model) }?;
        let spk_model = unsafe { spk_model_ref(spk_model) }?;
        let grammar = unsafe { c_str(grammar, "grammar") }?;
        Ok(RecognizerSession::with_grammar_and_speaker(
            model,
            spk_model,
            sample_rate,
            grammar,
        )?)
    })
}

/// 0 reports the best path; k > 0 up to k alternatives. Negative values
/// are ignored.
#[no_mangle]
pub unsafe extern "C" fn vrecog_recognizer_set_max_alternatives(
    recognizer: *mut VRecogRecognizer,
    max_alternatives: c_int,
) {
    let _ = ffi_safe_call(|| {
        check_null(recognizer, "recognizer")?;
        let max = usize::try_from(max_alternatives).map_err(|_| {
            FfiError::InvalidArgument(format!("max_alternatives {}", max_alternatives))
        })?;
        // SAFETY: non-null recognizer handle
        unsafe { &mut *recognizer }.session.set_max_alternatives(max);
        Ok(())
    });
}

/// 16-bit little-endian PCM; `length` in bytes
#[no_mangle]
pub unsafe extern "C" fn vrecog_recognizer_accept_waveform(
    recognizer: *mut VRecogRecognizer,
    data: *const c_char,
    length: c_int,
    flag: bool,
) -> c_int {
    unsafe {
        accept(recognizer, |session| {
            let data = c_slice(data.cast::<u8>(), length, "data")?;
            Ok(session.accept_waveform(AudioBuffer::pcm16(data), flag)?)
        })
    }
}

/// 8-bit unsigned PCM, 128 is silence; `length` in bytes
#[no_mangle]
pub unsafe extern "C" fn vrecog_recognizer_accept_waveform_u8(
    recognizer: *mut VRecogRecognizer,
    data: *const c_uchar,
    length: c_int,
    flag: bool,
) -> c_int {
    unsafe {
        accept(recognizer, |session| {
            let data = c_slice(data, length, "data")?;
            let audio = AudioBuffer::Bytes {
                data,
                width: SampleWidth::U8,
            };
            Ok(session.accept_waveform(audio, flag)?)
        })
    }
}

/// `length` in samples
#[no_mangle]
pub unsafe extern "C" fn vrecog_recognizer_accept_waveform_s(
    recognizer: *mut VRecogRecognizer,
    data: *const c_short,
    length: c_int,
    flag: bool,
) -> c_int {
    unsafe {
        accept(recognizer, |session| {
            let data = c_slice(data, length, "data")?;
            Ok(session.accept_waveform(AudioBuffer::Shorts(data), flag)?)
        })
    }
}

/// Normalized float samples in [-1, 1]; `length` in samples
#[no_mangle]
pub unsafe extern "C" fn vrecog_recognizer_accept_waveform_f(
    recognizer: *mut VRecogRecognizer,
    data: *const c_float,
    length: c_int,
    flag: bool,
) -> c_int {
    unsafe {
        accept(recognizer, |session| {
            let data = c_slice(data, length, "data")?;
            Ok(session.accept_waveform(AudioBuffer::Floats(data), flag)?)
        })
    }
}

/// Whether `word` is in the recognizer's wake-word vocabulary
#[no_mangle]
pub unsafe extern "C" fn vrecog_recognizer_check_wakeword_status(
    recognizer: *mut VRecogRecognizer,
    word: *const c_char,
) -> bool {
    ffi_safe_call(|| {
        check_null(recognizer, "recognizer")?;
        let word = unsafe { c_str(word, "word") }?;
        // SAFETY: non-null recognizer handle
        Ok(unsafe { &*recognizer }.session.check_wake_availability(word))
    })
    .unwrap_or(false)
}

#[no_mangle]
pub unsafe extern "C" fn vrecog_recognizer_result(recognizer: *mut VRecogRecognizer) -> *const c_char {
    unsafe { result_string(recognizer, |session| session.result()) }
}

#[no_mangle]
pub unsafe extern "C" fn vrecog_recognizer_partial_result(
    recognizer: *mut VRecogRecognizer,
) -> *const c_char {
    unsafe { result_string(recognizer, |session| session.partial_result()) }
}

/// Flush and finalize; the recognizer accepts no audio afterwards
#[no_mangle]
pub unsafe extern "C" fn vrecog_recognizer_final_result(
    recognizer: *mut VRecogRecognizer,
) -> *const c_char {
    unsafe { result_string(recognizer, |session| session.final_result()) }
}

#[no_mangle]
pub unsafe extern "C" fn vrecog_recognizer_kws_result(recognizer: *mut VRecogRecognizer) -> *const c_char {
    unsafe { result_string(recognizer, |session| session.kws_result()) }
}

#[no_mangle]
pub unsafe extern "C" fn vrecog_recognizer_free(recognizer: *mut VRecogRecognizer) {
    if recognizer.is_null() {
        return;
    }
    // SAFETY: handle from a vrecog_recognizer_new* function, freed once
    drop(unsafe { Box::from_raw(recognizer) });
}

// ---------------------------------------------------------------------------
// Process-wide state
// ---------------------------------------------------------------------------

/// `< 0` warnings only, `0` info (default), `> 0` more verbose
#[no_mangle]
pub extern "C" fn vrecog_set_log_level(log_level: c_int) {
    let _ = ffi_safe_call(|| {
        Runtime::global().set_log_level(log_level);
        Ok(())
    });
}

/// Once, on the main thread, before any decoding
#[no_mangle]
pub extern "C" fn vrecog_gpu_init() {
    let _ = ffi_safe_call(|| {
        Runtime::global().gpu_init();
        Ok(())
    });
}

/// Once on every other thread that decodes
#[no_mangle]
pub extern "C" fn vrecog_gpu_thread_init() {
    let _ = ffi_safe_call(|| {
        Runtime::global().gpu_thread_init();
        Ok(())
    });
}

#[no_mangle]
pub extern "C" fn vrecog_version() -> *const c_char {
    static VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "\0");
    VERSION.as_ptr() as *const c_char
}
