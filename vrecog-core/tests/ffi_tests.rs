//! C ABI round trips

mod common;

use common::*;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;
use vrecog_core::ffi::*;

fn cstring(path: &std::path::Path) -> CString {
    CString::new(path.to_str().unwrap()).unwrap()
}

unsafe fn read(ptr: *const c_char) -> serde_json::Value {
    assert!(!ptr.is_null());
    json(unsafe { CStr::from_ptr(ptr) }.to_str().unwrap())
}

#[test]
fn test_model_lifecycle() {
    let dir = model_dir(true);
    let path = cstring(dir.path());

    unsafe {
        let model = vrecog_model_new(path.as_ptr(), 2);
        assert!(!model.is_null());
        assert!(vrecog_model_check_asr_load_status(model));
        assert!(vrecog_model_check_kws_load_status(model));

        let yes = CString::new("yes").unwrap();
        let eps = CString::new("<eps>").unwrap();
        let missing = CString::new("maybe").unwrap();
        assert_eq!(vrecog_model_find_word(model, yes.as_ptr()), 3);
        assert_eq!(vrecog_model_find_word(model, eps.as_ptr()), 0);
        assert_eq!(vrecog_model_find_word(model, missing.as_ptr()), -1);
        assert_eq!(vrecog_model_find_word(model, ptr::null()), -1);

        vrecog_model_free(model);
    }
}

#[test]
fn test_model_load_failures() {
    let dir = tempfile::tempdir().unwrap();
    let path = cstring(dir.path());

    unsafe {
        assert!(vrecog_model_new(path.as_ptr(), 0).is_null());
        assert!(vrecog_model_new(ptr::null(), 0).is_null());
        assert!(vrecog_model_new(path.as_ptr(), 9).is_null());
        assert!(!vrecog_model_check_asr_load_status(ptr::null_mut()));
        vrecog_model_free(ptr::null_mut());
    }
}

#[test]
fn test_recognizer_round_trip() {
    let dir = model_dir(true);
    let path = cstring(dir.path());

    unsafe {
        let model = vrecog_model_new(path.as_ptr(), 0);
        let recognizer = vrecog_recognizer_new(model, SAMPLE_RATE);
        assert!(!recognizer.is_null());
        // The recognizer keeps the model alive
        vrecog_model_free(model);

        let lead = to_pcm_bytes(&silence(1.0));
        assert_eq!(
            vrecog_recognizer_accept_waveform(recognizer, lead.as_ptr().cast(), lead.len() as i32, false),
            0
        );
        let speech = to_i16(&word("yes", 0.5));
        assert_eq!(
            vrecog_recognizer_accept_waveform_s(recognizer, speech.as_ptr(), speech.len() as i32, false),
            0
        );
        assert_eq!(read(vrecog_recognizer_partial_result(recognizer))["partial"], "yes");

        let tail = silence(1.0);
        assert_eq!(
            vrecog_recognizer_accept_waveform_f(recognizer, tail.as_ptr(), tail.len() as i32, false),
            1
        );
        assert_eq!(read(vrecog_recognizer_result(recognizer))["text"], "yes");
        assert_eq!(read(vrecog_recognizer_final_result(recognizer))["text"], "yes");

        // Closed: negative code and an error JSON
        assert_eq!(
            vrecog_recognizer_accept_waveform_f(recognizer, tail.as_ptr(), tail.len() as i32, false),
            -3
        );
        let error = read(vrecog_recognizer_result(recognizer));
        assert_eq!(error["code"], -3);

        vrecog_recognizer_free(recognizer);
    }
}

#[test]
fn test_invalid_audio_codes() {
    let dir = model_dir(true);
    let path = cstring(dir.path());

    unsafe {
        let model = vrecog_model_new(path.as_ptr(), 0);
        let recognizer = vrecog_recognizer_new(model, SAMPLE_RATE);

        let odd = [0 as c_char; 3];
        assert_eq!(vrecog_recognizer_accept_waveform(recognizer, odd.as_ptr(), 3, false), -4);
        assert_eq!(vrecog_recognizer_accept_waveform(recognizer, ptr::null(), 0, false), 0);
        assert_eq!(vrecog_recognizer_accept_waveform(recognizer, ptr::null(), 4, false), -10);
        assert_eq!(vrecog_recognizer_accept_waveform(recognizer, odd.as_ptr(), -2, false), -11);
        assert_eq!(vrecog_recognizer_accept_waveform(ptr::null_mut(), odd.as_ptr(), 2, false), -10);

        vrecog_recognizer_free(recognizer);
        vrecog_model_free(model);
    }
}

#[test]
fn test_wake_word_recognizers() {
    let dir = model_dir(true);
    let spk_dir = speaker_dir(10);
    let path = cstring(dir.path());
    let spk_path = cstring(spk_dir.path());
    let grammar = CString::new(r#"["hello system", "[unk]"]"#).unwrap();
    let hello_system = CString::new("hello system").unwrap();
    let yes = CString::new("yes").unwrap();

    unsafe {
        let model = vrecog_model_new(path.as_ptr(), 2);
        let spk = vrecog_spk_model_new(spk_path.as_ptr());
        assert!(!spk.is_null());

        let wake = vrecog_recognizer_new_wake(model, SAMPLE_RATE, grammar.as_ptr());
        assert!(!wake.is_null());
        assert!(vrecog_recognizer_check_wakeword_status(wake, hello_system.as_ptr()));
        assert!(!vrecog_recognizer_check_wakeword_status(wake, yes.as_ptr()));
        assert_eq!(read(vrecog_recognizer_kws_result(wake))["detected"], false);

        let audio = [word("hello", 0.4), word("system", 0.4), silence(0.3)].concat();
        assert_eq!(
            vrecog_recognizer_accept_waveform_f(wake, audio.as_ptr(), audio.len() as i32, false),
            1
        );
        assert_eq!(read(vrecog_recognizer_kws_result(wake))["text"], "hello system");

        let gram = vrecog_recognizer_new_gram(model, SAMPLE_RATE, grammar.as_ptr(), true);
        let grm_spk = vrecog_recognizer_new_grm_spk(model, spk, SAMPLE_RATE, grammar.as_ptr());
        let with_spk = vrecog_recognizer_new_spk(model, spk, SAMPLE_RATE);
        assert!(!gram.is_null() && !grm_spk.is_null() && !with_spk.is_null());

        let bad = CString::new("not json").unwrap();
        assert!(vrecog_recognizer_new_wake(model, SAMPLE_RATE, bad.as_ptr()).is_null());
        assert!(vrecog_recognizer_new_spk(model, ptr::null_mut(), SAMPLE_RATE).is_null());

        for recognizer in [wake, gram, grm_spk, with_spk] {
            vrecog_recognizer_free(recognizer);
        }
        vrecog_spk_model_free(spk);
        vrecog_model_free(model);
    }
}

#[test]
fn test_u8_audio_over_ffi() {
    let dir = model_dir(true);
    let path = cstring(dir.path());

    unsafe {
        let model = vrecog_model_new(path.as_ptr(), 0);
        let recognizer = vrecog_recognizer_new(model, SAMPLE_RATE);

        let audio = to_u8(&[silence(0.3), word("hello", 0.5)].concat());
        assert_eq!(
            vrecog_recognizer_accept_waveform_u8(recognizer, audio.as_ptr(), audio.len() as i32, false),
            0
        );
        assert_eq!(vrecog_recognizer_accept_waveform_u8(recognizer, ptr::null(), 0, false), 0);
        assert_eq!(vrecog_recognizer_accept_waveform_u8(recognizer, ptr::null(), 8, false), -10);
        assert_eq!(read(vrecog_recognizer_final_result(recognizer))["text"], "hello");

        vrecog_recognizer_free(recognizer);
        vrecog_model_free(model);
    }
}

#[test]
fn test_max_alternatives_over_ffi() {
    let dir = model_dir(true);
    let path = cstring(dir.path());

    unsafe {
        let model = vrecog_model_new(path.as_ptr(), 0);
        let recognizer = vrecog_recognizer_new(model, SAMPLE_RATE);
        vrecog_recognizer_set_max_alternatives(recognizer, 2);
        vrecog_recognizer_set_max_alternatives(recognizer, -1);

        let audio = word("no", 0.4);
        vrecog_recognizer_accept_waveform_f(recognizer, audio.as_ptr(), audio.len() as i32, false);
        let result = read(vrecog_recognizer_final_result(recognizer));
        let alternatives = result["alternatives"].as_array().unwrap();
        assert!(alternatives.len() <= 2);
        assert_eq!(alternatives[0]["text"], "no");

        vrecog_recognizer_free(recognizer);
        vrecog_model_free(model);
    }
}

#[test]
fn test_max_alternatives_int_max_over_ffi() {
    let dir = model_dir(true);
    let path = cstring(dir.path());

    unsafe {
        let model = vrecog_model_new(path.as_ptr(), 0);
        let recognizer = vrecog_recognizer_new(model, SAMPLE_RATE);
        vrecog_recognizer_set_max_alternatives(recognizer, i32::MAX);

        let audio = word("no", 0.4);
        vrecog_recognizer_accept_waveform_f(recognizer, audio.as_ptr(), audio.len() as i32, false);
        let result = read(vrecog_recognizer_final_result(recognizer));
        assert_eq!(result["alternatives"][0]["text"], "no");

        vrecog_recognizer_free(recognizer);
        vrecog_model_free(model);
    }
}

#[test]
fn test_global_setters() {
    vrecog_set_log_level(-1);
    vrecog_set_log_level(1);
    vrecog_set_log_level(0);
    vrecog_gpu_init();
    vrecog_gpu_init();
    vrecog_gpu_thread_init();

    let version = unsafe { CStr::from_ptr(vrecog_version()) }.to_str().unwrap();
    assert_eq!(version, env!("CARGO_PKG_VERSION"));
}
