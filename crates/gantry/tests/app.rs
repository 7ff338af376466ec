//! Start-up from a configuration file through to a served request.

use std::fs;
use std::time::Duration;

use gantry::app;
use gantry::prelude::*;
use gantry::server::PipelineConfigBuilder;
use gantry_test::TestClient;
use http::StatusCode;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

const CONFIG: &str = r#"
[server]
http_addr = "127.0.0.1:0"
shutdown_timeout_secs = 1
max_body_bytes = 1024

[web]
context_path = "/svc"
lenient_body_decoding = true

[logging]
level = "debug"
format = "pretty"
"#;

fn write_config(dir: &tempfile::TempDir) -> std::path::PathBuf {
    let path = dir.path().join("gantry.toml");
    fs::write(&path, CONFIG).unwrap();
    path
}

fn pipeline(config: &GantryConfig) -> Pipeline {
    Gantry::new()
        .config(PipelineConfigBuilder::from_web_config(config).build())
        .routes(|mapper| mapper.get("/ping").handle(|| "pong"))
        .build()
        .unwrap()
}

#[test]
fn test_load_config_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir);
    let config = app::load_config(Some(path.as_path())).unwrap();

    assert_eq!(config.server.http_addr, "127.0.0.1:0");
    assert_eq!(config.server.max_body_bytes, 1024);
    assert_eq!(config.web.context_path, "/svc");
    assert!(config.web.lenient_body_decoding);
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_load_config_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = app::load_config(Some(dir.path().join("absent.toml").as_path())).unwrap_err();
    assert!(err.to_string().contains("absent.toml"), "{err:#}");
}

#[test]
fn test_init_logging_twice_is_harmless() {
    let config = GantryConfig::default();
    app::init_logging(&config).unwrap();
    app::init_logging(&config).unwrap();
}

#[test]
fn test_pipeline_follows_web_section() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir);
    let config = app::load_config(Some(path.as_path())).unwrap();
    let pipeline = pipeline(&config);

    assert_eq!(pipeline.config().context_path(), "/svc");
    assert!(pipeline.config().lenient_body_decoding());

    let client = TestClient::new(pipeline);
    client.get("/svc/ping").send().assert_status(StatusCode::OK);
    client.get("/ping").send().assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_serves_configured_pipeline_over_tcp() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir);
    let config = app::load_config(Some(path.as_path())).unwrap();
    let server_config = ServerConfig::from_server_config(&config.server);
    assert_eq!(server_config.shutdown_timeout(), Duration::from_secs(1));

    let listener = TcpListener::bind(server_config.http_addr()).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = ShutdownSignal::new();
    let server = Server::new(server_config, pipeline(&config));
    let handle = tokio::spawn(server.serve(listener, shutdown.clone()));

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /svc/ping HTTP/1.1\r\nhost: test\r\nconnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut reply = Vec::new();
    stream.read_to_end(&mut reply).await.unwrap();
    let reply = String::from_utf8_lossy(&reply);
    assert!(reply.starts_with("HTTP/1.1 200"), "{reply}");
    assert!(reply.ends_with("\"pong\""), "{reply}");

    shutdown.trigger();
    handle.await.unwrap().unwrap();
}
