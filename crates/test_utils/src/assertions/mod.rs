//! Assertion utilities for testing

/// Assert that a result is OK and unwrap it
#[macro_export]
macro_rules! assert_ok {
    ($expr:expr) => {
        match $expr {
            Ok(val) => val,
            Err(err) => panic!("Expected Ok, got Err: {:?}", err),
        }
    };
    ($expr:expr, $($arg:tt)+) => {
        match $expr {
            Ok(val) => val,
            Err(err) => panic!("Expected Ok, got Err: {:?} ({})", err, format!($($arg)+)),
        }
    };
}

/// Assert that a result is Err and unwrap the error
#[macro_export]
macro_rules! assert_err {
    ($expr:expr) => {
        match $expr {
            Ok(val) => panic!("Expected Err, got Ok: {:?}", val),
            Err(err) => err,
        }
    };
    ($expr:expr, $($arg:tt)+) => {
        match $expr {
            Ok(val) => panic!("Expected Err, got Ok: {:?} ({})", val, format!($($arg)+)),
            Err(err) => err,
        }
    };
}

/// Assert that a reconciliation diff classifies `$id` as `$pattern`
#[macro_export]
macro_rules! assert_reconciled {
    ($diff:expr, $id:expr, $pattern:pat) => {
        match $diff.outcomes.get(&$id) {
            Some(state) => assert!(
                matches!(state, $pattern),
                "{} reconciled as {:?}, expected {}",
                $id,
                state,
                stringify!($pattern)
            ),
            None => panic!("{} missing from reconciliation diff", $id),
        }
    };
}
