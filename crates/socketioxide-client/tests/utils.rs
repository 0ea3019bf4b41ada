#![allow(dead_code)]

//! Assertion helpers returning the unwrapped value, with an optional context message.

#[macro_export]
macro_rules! assert_ok {
    ($e:expr) => {
        assert_ok!($e, "")
    };
    ($e:expr, $($ctx:tt)+) => {
        match $e {
            ::std::result::Result::Ok(v) => v,
            ::std::result::Result::Err(e) => {
                panic!("expected Ok, got Err({:?}) {}", e, format_args!($($ctx)+))
            }
        }
    };
}

#[macro_export]
macro_rules! assert_err {
    ($e:expr) => {
        assert_err!($e, "")
    };
    ($e:expr, $($ctx:tt)+) => {
        match $e {
            ::std::result::Result::Err(e) => e,
            ::std::result::Result::Ok(v) => {
                panic!("expected Err, got Ok({:?}) {}", v, format_args!($($ctx)+))
            }
        }
    };
}

#[macro_export]
macro_rules! assert_some {
    ($e:expr) => {
        assert_some!($e, "")
    };
    ($e:expr, $($ctx:tt)+) => {
        match $e {
            ::std::option::Option::Some(v) => v,
            ::std::option::Option::None => {
                panic!("expected Some, got None {}", format_args!($($ctx)+))
            }
        }
    };
}
