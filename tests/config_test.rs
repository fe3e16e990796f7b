//! Configuration loading from disk

use std::io::Write;

use solana_sdk::commitment_config::CommitmentConfig;
use solwallet::config::Config;
use solwallet::FlowError;
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_full_config() {
    let file = write_config(
        r#"
[rpc]
url = "http://127.0.0.1:8899"
commitment = "finalized"
timeout_secs = 10
confirm_timeout_secs = 90
confirm_poll_interval_ms = 250

[wallet]
keypair_path = "/tmp/id.json"

[transfer]
default_lamports = 1000

[history]
strict = true
concurrency = 4
page_limit = 100
max_signatures = 500

[logging]
level = "debug"
json = true
"#,
    );

    let config = Config::from_file(file.path().to_str().unwrap()).unwrap();

    assert!(config.validate().is_ok());
    assert_eq!(config.rpc.url, "http://127.0.0.1:8899");
    assert_eq!(
        config.rpc.commitment_config().unwrap(),
        CommitmentConfig::finalized()
    );
    assert_eq!(config.rpc.confirm_poll_interval_ms, 250);
    assert_eq!(config.wallet.keypair_path, "/tmp/id.json");
    assert_eq!(config.transfer.default_lamports, 1000);
    assert!(config.history.strict);
    assert_eq!(config.history.concurrency, 4);
    assert_eq!(config.history.max_signatures, Some(500));
    assert!(config.logging.json);
}

#[test]
fn test_partial_config_fills_defaults() {
    let file = write_config(
        r#"
[history]
concurrency = 8
"#,
    );

    let config = Config::from_file(file.path().to_str().unwrap()).unwrap();

    assert_eq!(config.history.concurrency, 8);
    assert!(!config.history.strict);
    assert_eq!(config.rpc.commitment, "confirmed");
    assert_eq!(config.transfer.default_lamports, 500_000_000);
    assert!(config.validate().is_ok());
}

#[test]
fn test_invalid_values_fail_validation() {
    let file = write_config(
        r#"
[rpc]
url = "ws://127.0.0.1:8900"
"#,
    );
    let config = Config::from_file(file.path().to_str().unwrap()).unwrap();
    assert!(matches!(config.validate(), Err(FlowError::Configuration(_))));

    let file = write_config(
        r#"
[transfer]
default_lamports = 0
"#,
    );
    let config = Config::from_file(file.path().to_str().unwrap()).unwrap();
    assert!(matches!(config.validate(), Err(FlowError::Configuration(_))));
}

#[test]
fn test_malformed_toml_is_an_error() {
    let file = write_config("[rpc\nurl = ");
    assert!(Config::from_file(file.path().to_str().unwrap()).is_err());
}

#[test]
fn test_missing_file_is_an_error() {
    assert!(Config::from_file("/nonexistent/solwallet.toml").is_err());
}
