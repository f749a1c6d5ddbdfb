// Copyright 2025 The Drasi Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Declarative macros for engine completion entry points.

/// Generate an `extern "C"` completion entry point whose body runs inside
/// [`guard_completion`](crate::guard_completion).
///
/// The parameter list is copied verbatim, so the generated function matches
/// whatever completion signature the engine declares.
///
/// # Example
///
/// ```rust
/// use cbridge_ffi_primitives::*;
/// use std::ffi::c_void;
///
/// completion_fn! {
///     /// Called by the engine when a widget is ready.
///     fn on_widget_ready(error_code: i32, user_data: *mut c_void) {
///         let _ = (error_code, user_data);
///     }
/// }
///
/// let callback: extern "C" fn(i32, *mut c_void) = on_widget_ready;
/// callback(OP_SUCCESS, std::ptr::null_mut());
/// ```
#[macro_export]
macro_rules! completion_fn {
    (
        $(#[$meta:meta])*
        $vis:vis fn $name:ident ( $($param:ident : $param_ty:ty),* $(,)? ) $body:block
    ) => {
        $(#[$meta])*
        $vis extern "C" fn $name($($param: $param_ty),*) {
            $crate::guard_completion(stringify!($name), move || $body)
        }
    };
}

#[cfg(test)]
mod tests {
    use std::ffi::c_void;
    use std::sync::atomic::{AtomicI32, Ordering};

    static LAST_CODE: AtomicI32 = AtomicI32::new(i32::MIN);

    completion_fn! {
        fn record_code(error_code: i32, _user_data: *mut c_void) {
            LAST_CODE.store(error_code, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_generated_entry_point_matches_signature() {
        let callback: extern "C" fn(i32, *mut c_void) = record_code;
        callback(17, std::ptr::null_mut());
        assert_eq!(LAST_CODE.load(Ordering::SeqCst), 17);
    }
}
