// Copyright (c) 2024 The vulkano developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

#![cfg(test)]

/// Creates a device, installing the test logger first.
///
/// - `device!()` uses the default configuration.
/// - `device!(geometry: oracle)` replaces the geometry oracle.
/// - `device!(create_info)` uses the given `DeviceCreateInfo`.
macro_rules! device {
    () => {
        device!($crate::device::DeviceCreateInfo::default())
    };

    (geometry: $geometry:expr) => {
        device!($crate::device::DeviceCreateInfo {
            geometry: Some(::std::sync::Arc::new($geometry)),
            ..Default::default()
        })
    };

    ($create_info:expr) => {{
        let _ = ::env_logger::builder().is_test(true).try_init();

        $crate::device::Device::new($create_info).unwrap()
    }};
}

macro_rules! assert_should_panic {
    ($msg:expr, $code:block) => {{
        let res = ::std::panic::catch_unwind(::std::panic::AssertUnwindSafe(|| $code));

        match res {
            Ok(_) => panic!("Test expected to panic but didn't"),
            Err(err) => {
                if let Some(msg) = err.downcast_ref::<String>() {
                    assert!(msg.contains($msg));
                } else if let Some(&msg) = err.downcast_ref::<&str>() {
                    assert!(msg.contains($msg));
                } else {
                    panic!("Couldn't decipher the panic message of the test")
                }
            }
        }
    }};

    ($code:block) => {{
        let res = ::std::panic::catch_unwind(::std::panic::AssertUnwindSafe(|| $code));

        match res {
            Ok(_) => panic!("Test expected to panic but didn't"),
            Err(_) => {}
        }
    }};
}
