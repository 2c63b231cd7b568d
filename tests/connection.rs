use clickhouse_log_sink::{ClickHouseConfig, ClickHouseSink, ConfigError};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> ClickHouseConfig {
    let addr = server.address();
    let mut config = ClickHouseConfig::new(addr.ip().to_string(), "events");
    config.port = addr.port();
    config.database = "logs".into();
    config
}

#[tokio::test]
async fn connect_runs_show_tables() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("query", "SHOW TABLES"))
        .and(query_param("database", "logs"))
        .and(query_param("input_format_skip_unknown_fields", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("events\n"))
        .expect(1)
        .mount(&server)
        .await;

    let sink = ClickHouseSink::connect(config_for(&server)).await.unwrap();
    assert_eq!(sink.table(), "events");
}

#[tokio::test]
async fn non_200_is_a_config_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(516).set_body_string("Authentication failed"))
        .mount(&server)
        .await;

    let err = ClickHouseSink::connect(config_for(&server)).await.err().unwrap();
    match err {
        ConfigError::UnexpectedStatus { status, body } => {
            assert_eq!(status, 516);
            assert_eq!(body, "Authentication failed");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn other_2xx_is_still_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let sink = ClickHouseSink::new(config_for(&server)).unwrap();
    assert!(matches!(
        sink.test_connection().await,
        Err(ConfigError::UnexpectedStatus { status: 204, .. })
    ));
}

#[tokio::test]
async fn refused_connection_is_reported() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let mut config = ClickHouseConfig::new("127.0.0.1", "events");
    config.port = port;

    let err = ClickHouseSink::connect(config).await.err().unwrap();
    assert!(matches!(err, ConfigError::ConnectionRefused { .. }), "got {:?}", err);
    assert!(err.to_string().contains("connection refused"));
}

#[tokio::test]
async fn invalid_config_fails_before_any_request() {
    let config = ClickHouseConfig::new("127.0.0.1", "");
    let err = ClickHouseSink::connect(config).await.err().unwrap();
    assert!(matches!(err, ConfigError::MissingField("table")));
}
