use super::*;

#[test]
fn default_config_is_valid() {
    assert!(validate(&RelayConfig::default()).is_ok());
}

#[test]
fn empty_command_is_rejected() {
    let mut config = RelayConfig::default();
    config.cli.command = "   ".into();
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("cli.command must not be empty"));
}

#[test]
fn zero_port_is_rejected() {
    let mut config = RelayConfig::default();
    config.server.port = 0;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("server.port"));
}

#[test]
fn dimensions_out_of_range_are_rejected() {
    let mut config = RelayConfig::default();
    config.cli.default_cols = 0;
    config.cli.default_rows = 5000;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("cli.default_cols = 0 is out of range [1, 1000]"));
    assert!(err.contains("cli.default_rows = 5000 is out of range [1, 1000]"));
}

#[test]
fn queue_capacity_out_of_range_is_rejected() {
    let mut config = RelayConfig::default();
    config.cli.output_queue_capacity = 0;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("cli.output_queue_capacity"));
}

#[test]
fn utf8_spellings_are_accepted() {
    for label in ["utf-8", "UTF-8", "utf8", "UTF_8"] {
        let mut config = RelayConfig::default();
        config.cli.encoding = label.into();
        assert!(validate(&config).is_ok(), "{label} should be accepted");
    }
}

#[test]
fn other_encodings_are_rejected() {
    let mut config = RelayConfig::default();
    config.cli.encoding = "latin-1".into();
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("latin-1"));
}

#[test]
fn multiple_errors_are_joined() {
    let mut config = RelayConfig::default();
    config.cli.command = String::new();
    config.server.port = 0;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("; "));
}
