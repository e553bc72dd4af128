#[cfg(test)]
/// # Panics
/// Panics if the result is `Ok` (operation succeeded when error was expected).
pub fn assert_error_sqlstate<T>(
    result: crate::KpiResult<T>,
    expected_sqlstate: &str,
) {
    match result {
        Err(e) => {
            assert_eq!(
                e.sqlstate(),
                expected_sqlstate,
                "Expected SQLSTATE {expected_sqlstate}, got {}: {e}",
                e.sqlstate()
            );
        }
        Ok(_) => {
            panic!("Expected error with SQLSTATE {expected_sqlstate}, but operation succeeded");
        }
    }
}

#[cfg(test)]
/// # Panics
/// Panics if the result is `Ok` (operation succeeded when error was expected).
pub fn assert_error_contains<T>(
    result: crate::KpiResult<T>,
    expected_substring: &str,
) {
    match result {
        Err(e) => {
            let message = e.to_string();
            assert!(
                message.contains(expected_substring),
                "Error message '{message}' does not contain '{expected_substring}'"
            );
        }
        Ok(_) => {
            panic!("Expected error containing '{expected_substring}', but operation succeeded");
        }
    }
}

#[cfg(test)]
/// # Panics
/// Panics unless `view` is reported dropped with a reason containing `expected_reason`.
pub fn assert_view_dropped(
    report: &crate::report::SynthesisReport,
    view: &str,
    expected_reason: &str,
) {
    match report.outcome(view) {
        Some(crate::report::ViewStatus::Dropped { reason }) => {
            assert!(
                reason.contains(expected_reason),
                "View {view} dropped for '{reason}', expected '{expected_reason}'"
            );
        }
        other => panic!("Expected view {view} to be dropped, got {other:?}"),
    }
}

#[cfg(test)]
/// # Panics
/// Panics unless `view` is reported failed with `expected_sqlstate`.
pub fn assert_view_failed(
    report: &crate::report::SynthesisReport,
    view: &str,
    expected_sqlstate: &str,
) {
    match report.outcome(view) {
        Some(crate::report::ViewStatus::Failed { sqlstate, error, .. }) => {
            assert_eq!(
                sqlstate, expected_sqlstate,
                "View {view} failed with SQLSTATE {sqlstate} ({error}), expected {expected_sqlstate}"
            );
        }
        other => panic!("Expected view {view} to fail with SQLSTATE {expected_sqlstate}, got {other:?}"),
    }
}
