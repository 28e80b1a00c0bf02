//! Custom assertion macros and utilities
//!
//! Provides enhanced assertion macros for better test output and
//! more descriptive error messages.

/// Assert that a result is ok and return the value
#[macro_export]
macro_rules! assert_ok {
    ($result:expr) => {
        match $result {
            Ok(value) => value,
            Err(e) => panic!("Expected Ok, got Err: {:?}", e),
        }
    };
    ($result:expr, $message:expr) => {
        match $result {
            Ok(value) => value,
            Err(e) => panic!("{}: {:?}", $message, e),
        }
    };
}

/// Assert that a result is an error of the given variant pattern
#[macro_export]
macro_rules! assert_err {
    ($result:expr) => {
        assert!($result.is_err(), "Expected Err, got Ok");
    };
    ($result:expr, $pattern:pat) => {
        match $result {
            Err($pattern) => {}
            Ok(value) => panic!("Expected Err, got Ok: {:?}", value),
            Err(e) => panic!("Expected different error variant, got: {:?}", e),
        }
    };
}

/// Assert that a mock server saw exactly `$count` requests
#[macro_export]
macro_rules! assert_request_count {
    ($server:expr, $count:expr) => {
        let received = $server.received_requests().await.unwrap_or_default();
        assert_eq!(
            received.len(),
            $count,
            "Expected {} requests, got {}: {:?}",
            $count,
            received.len(),
            received.iter().map(|r| format!("{} {}", r.method, r.url)).collect::<Vec<_>>()
        );
    };
}
