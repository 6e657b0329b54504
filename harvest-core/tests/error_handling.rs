use harvest_core::{ConfigError, CoreError, ErrorExt, ErrorReporter, RedditApiError};

#[test]
fn test_error_codes() {
    let reddit_error = CoreError::RedditApi(RedditApiError::InvalidToken);
    assert_eq!(reddit_error.error_code(), "REDDIT_API");

    let config_error = CoreError::Config(ConfigError::MissingField {
        field: "REDDIT_CLIENT_ID".to_string(),
    });
    assert_eq!(config_error.error_code(), "CONFIG");

    let input_error = CoreError::invalid_input("limit must be positive");
    assert_eq!(input_error.error_code(), "INVALID_INPUT");

    let auth_error = RedditApiError::AuthenticationFailed {
        reason: "bad password".to_string(),
    };
    assert_eq!(auth_error.error_code(), "REDDIT_AUTH_FAILED");
}

#[test]
fn test_user_friendly_messages() {
    let reddit_error = CoreError::RedditApi(RedditApiError::InvalidToken);
    let message = reddit_error.user_friendly_message();
    assert!(message.contains("authentication token is invalid"));

    let config_error = CoreError::Config(ConfigError::MissingField {
        field: "REDDIT_USER_AGENT".to_string(),
    });
    assert!(config_error
        .user_friendly_message()
        .contains("REDDIT_USER_AGENT"));

    let missing = CoreError::Config(ConfigError::FileNotFound {
        path: "reddit_api.env".to_string(),
    });
    assert!(missing.user_friendly_message().contains("reddit_api.env"));
}

#[test]
fn test_invalid_input_display() {
    let error = CoreError::invalid_input("forum name must not be empty");
    assert_eq!(
        error.to_string(),
        "Invalid input: forum name must not be empty"
    );
}

#[test]
fn test_error_reporter() {
    let error = CoreError::RedditApi(RedditApiError::InvalidToken);

    // Reporting only logs; it must not panic.
    ErrorReporter::new().report_error(&error);
    ErrorReporter::default().report_error(&CoreError::invalid_input("empty query"));
}
