//! Integration tests for configuration loading

use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;
use usuarios_gateway::infra::Config;

fn write_config(content: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(content.as_bytes()).unwrap();
    temp_file.flush().unwrap();
    temp_file
}

#[test]
fn test_load_config_from_file() {
    let temp_file = write_config(
        r#"
[server]
bind_address = "127.0.0.1"
port = 9000

[backend]
graphql_url = "http://backend.test/graphql"
timeout_ms = 2500

[postal]
url_template = "http://cep.test/{cep}.json"
timeout_ms = 0

[metrics]
interval_secs = 15
"#,
    );

    let config = Config::from_file(temp_file.path()).unwrap();

    assert_eq!(config.bind_address(), "127.0.0.1");
    assert_eq!(config.port(), 9000);
    assert_eq!(config.graphql_url(), "http://backend.test/graphql");
    assert_eq!(config.backend_timeout(), Some(Duration::from_millis(2500)));
    assert_eq!(config.postal_url_template(), "http://cep.test/{cep}.json");
    assert_eq!(config.postal_timeout(), None);
    assert_eq!(config.metrics_interval_secs(), 15);
    assert_eq!(config.config_file(), temp_file.path().display().to_string());
}

#[test]
fn test_partial_config_uses_section_defaults() {
    let temp_file = write_config(
        r#"
[backend]
graphql_url = "http://backend.test/graphql"
"#,
    );

    let config = Config::from_file(temp_file.path()).unwrap();

    assert_eq!(config.graphql_url(), "http://backend.test/graphql");
    assert_eq!(config.backend_timeout(), Some(Duration::from_secs(10)));
    assert_eq!(config.port(), 8000);
    assert_eq!(config.postal_url_template(), "https://viacep.com.br/ws/{cep}/json/");
    assert_eq!(config.metrics_interval_secs(), 60);
}

#[test]
fn test_template_without_placeholder_is_rejected() {
    let temp_file = write_config(
        r#"
[postal]
url_template = "https://viacep.com.br/ws/json/"
"#,
    );

    let err = Config::from_file(temp_file.path()).unwrap_err();
    assert!(format!("{err:#}").contains("{cep}"));
}

#[test]
fn test_malformed_toml_is_an_error() {
    let temp_file = write_config("[server\nport = 1");
    assert!(Config::from_file(temp_file.path()).is_err());
}

#[test]
fn test_load_from_path_fallback() {
    let config = Config::load_from_path("/nonexistent/config.toml");
    assert_eq!(config.port(), 8000);
    assert_eq!(config.graphql_url(), "http://users-api:8001/graphql");
    assert_eq!(config.config_file(), "default");
}

#[test]
fn test_load_honours_config_argument() {
    let temp_file = write_config("[server]\nport = 8123\n");
    let args = vec![
        "usuarios-gateway".to_string(),
        "--config".to_string(),
        temp_file.path().display().to_string(),
    ];

    let config = Config::load(&args);
    assert_eq!(config.port(), 8123);
}
