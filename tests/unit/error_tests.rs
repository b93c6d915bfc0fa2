//! Unit tests for error display and conversions.

use swarm_watch::AppError;

#[test]
fn display_prefixes_by_domain() {
    assert_eq!(
        AppError::LockTimeout("another operation is in progress".into()).to_string(),
        "lock timeout: another operation is in progress"
    );
    assert_eq!(AppError::Spawn("denied".into()).to_string(), "spawn: denied");
    assert_eq!(AppError::Probe("not a repo".into()).to_string(), "probe: not a repo");
    assert_eq!(AppError::Parse("bad json".into()).to_string(), "parse: bad json");
}

#[test]
fn io_errors_convert() {
    let err: AppError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
    assert!(matches!(err, AppError::Io(_)));
    assert!(err.to_string().starts_with("io: "));
}

#[test]
fn toml_errors_convert_to_config() {
    let parse_err = toml::from_str::<toml::Value>("not = = toml").unwrap_err();
    let err: AppError = parse_err.into();
    assert!(matches!(err, AppError::Config(_)));
}
