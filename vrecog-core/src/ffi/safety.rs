//! Panic and pointer guards for the C boundary

use super::types::FfiError;
use std::ffi::CStr;
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Run `f`, turning a panic into [`FfiError::Panic`] and logging any failure.
pub fn ffi_safe_call<F, T>(f: F) -> Result<T, FfiError>
where
    F: FnOnce() -> Result<T, FfiError>,
{
    let result = match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(panic_err) => {
            let msg = if let Some(msg) = panic_err.downcast_ref::<&str>() {
                msg.to_string()
            } else if let Some(msg) = panic_err.downcast_ref::<String>() {
                msg.clone()
            } else {
                "unknown panic".to_string()
            };
            Err(FfiError::Panic(msg))
        }
    };

    if let Err(e) = &result {
        tracing::error!("FFI error: {:?}", e);
    }
    result
}

#[inline]
pub fn check_null<T>(ptr: *const T, param_name: &'static str) -> Result<(), FfiError> {
    if ptr.is_null() {
        Err(FfiError::NullPointer(param_name))
    } else {
        Ok(())
    }
}

/// Borrow a NUL-terminated UTF-8 argument
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string that outlives `'a`.
pub unsafe fn c_str<'a>(ptr: *const c_char, param_name: &'static str) -> Result<&'a str, FfiError> {
    check_null(ptr, param_name)?;
    // SAFETY: non-null and NUL-terminated per the caller contract
    let s = unsafe { CStr::from_ptr(ptr) };
    s.to_str()
        .map_err(|e| FfiError::InvalidArgument(format!("{} is not valid UTF-8: {}", param_name, e)))
}

/// Borrow a caller-owned sample buffer; a zero length never reads `ptr`
///
/// # Safety
/// For `len > 0`, `ptr` must point to `len` initialized values valid for `'a`.
pub unsafe fn c_slice<'a, T>(
    ptr: *const T,
    len: i32,
    param_name: &'static str,
) -> Result<&'a [T], FfiError> {
    let len = usize::try_from(len)
        .map_err(|_| FfiError::InvalidArgument(format!("{} has negative length {}", param_name, len)))?;
    if len == 0 {
        return Ok(&[]);
    }
    check_null(ptr, param_name)?;
    // SAFETY: non-null and `len` elements long per the caller contract
    Ok(unsafe { std::slice::from_raw_parts(ptr, len) })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_is_caught() {
        let result: Result<(), _> = ffi_safe_call(|| panic!("boom"));
        assert!(matches!(result, Err(FfiError::Panic(msg)) if msg == "boom"));
    }

    #[test]
    fn test_c_str() {
        let s = std::ffi::CString::new("hello").unwrap();
        assert_eq!(unsafe { c_str(s.as_ptr(), "s") }.unwrap(), "hello");
        assert!(matches!(
            unsafe { c_str(std::ptr::null(), "s") },
            Err(FfiError::NullPointer("s"))
        ));
    }

    #[test]
    fn test_c_slice() {
        let data = [1i16, 2, 3];
        assert_eq!(unsafe { c_slice(data.as_ptr(), 3, "data") }.unwrap(), &data);
        assert!(unsafe { c_slice::<i16>(std::ptr::null(), 0, "data") }.unwrap().is_empty());
        assert!(unsafe { c_slice(data.as_ptr(), -1, "data") }.is_err());
    }
}
