use vexillum::{Result, VexillumError};

#[test]
fn test_error_display() {
    let err = VexillumError::LocalRead {
        path: "images/a.png".to_string(),
        message: "permission denied".to_string(),
    };
    let text = err.to_string();
    assert!(text.contains("images/a.png"));
    assert!(text.contains("permission denied"));
}

#[test]
fn test_api_error_display() {
    let err = VexillumError::Api {
        status: 403,
        message: "forbidden".to_string(),
    };
    assert_eq!(err.to_string(), "API error (403): forbidden");
}

#[test]
fn test_result_alias() {
    fn returns_error() -> Result<()> {
        Err(VexillumError::Configuration("missing vault".into()))
    }
    assert!(returns_error().is_err());
}

#[test]
fn errors_are_cloneable_for_shared_outcomes() {
    let err = VexillumError::Http("connection reset".into());
    assert_eq!(err.clone(), err);
}

// ============================================================================
// Transient error classification
// ============================================================================

#[test]
fn transient_errors() {
    assert!(VexillumError::Http("connection reset".into()).is_transient());
    assert!(
        VexillumError::Api {
            status: 429,
            message: "slow down".into()
        }
        .is_transient()
    );
    assert!(
        VexillumError::Api {
            status: 503,
            message: "unavailable".into()
        }
        .is_transient()
    );
}

#[test]
fn permanent_errors() {
    assert!(
        !VexillumError::Api {
            status: 401,
            message: "bad key".into()
        }
        .is_transient()
    );
    assert!(!VexillumError::Configuration("x".into()).is_transient());
    assert!(!VexillumError::NotFound("a.png".into()).is_transient());
    assert!(!VexillumError::Task("aborted".into()).is_transient());
    assert!(
        !VexillumError::LocalRead {
            path: "a.png".into(),
            message: "empty".into()
        }
        .is_transient()
    );
}
