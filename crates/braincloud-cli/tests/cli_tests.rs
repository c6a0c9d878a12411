//! Tests for CLI parsing and the ping command

use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::PathBuf;
use std::thread;

use braincloud_cli::{
    Cli, CliError, Commands, PingArgs, cmd_ping, effective_config, load_regions, render,
};
use braincloud_client::lobby::ping::PingData;
use clap::Parser;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn write_file(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

fn args(regions: PathBuf) -> PingArgs {
    PingArgs {
        regions,
        parallelism: None,
        samples: None,
        timeout_ms: None,
        config: None,
        json: false,
        tick_ms: 5,
    }
}

#[test]
fn test_cli_parsing_help() {
    let result = Cli::try_parse_from(["braincloud-cli", "--help"]);
    assert!(result.is_err());
}

#[test]
fn test_ping_requires_regions() {
    let result = Cli::try_parse_from(["braincloud-cli", "ping"]);
    assert!(result.is_err());
}

#[test]
fn test_ping_arguments() {
    let cli = Cli::try_parse_from([
        "braincloud-cli",
        "ping",
        "--regions",
        "regions.json",
        "--parallelism",
        "4",
        "--samples",
        "6",
        "--timeout-ms",
        "750",
        "--json",
        "--log-level",
        "debug",
    ])
    .unwrap();

    assert_eq!(cli.log_level, "debug");
    let Commands::Ping(args) = cli.command;
    assert_eq!(args.regions, PathBuf::from("regions.json"));
    assert_eq!(args.parallelism, Some(4));
    assert_eq!(args.samples, Some(6));
    assert_eq!(args.timeout_ms, Some(750));
    assert!(args.json);
    assert_eq!(args.tick_ms, 16);
    assert!(args.config.is_none());
}

#[test]
fn test_flags_override_config_file() {
    let dir = TempDir::new().unwrap();
    let config = write_file(
        &dir,
        "ping.json",
        r#"{"parallelism": 3, "samples_per_region": 8}"#,
    );

    let mut args = args(PathBuf::from("unused.json"));
    args.config = Some(config);
    args.samples = Some(2);

    let config = effective_config(&args).unwrap();
    assert_eq!(config.parallelism, 3);
    assert_eq!(config.samples_per_region, 2);
    assert_eq!(config.probe_timeout_ms, 2_000);
}

#[test]
fn test_invalid_override_is_rejected() {
    let mut args = args(PathBuf::from("unused.json"));
    args.parallelism = Some(0);

    assert!(matches!(effective_config(&args), Err(CliError::Sdk(_))));
}

#[test]
fn test_load_bare_region_data() {
    let dir = TempDir::new().unwrap();
    let path = write_file(
        &dir,
        "regions.json",
        r#"{
            "us-east-1": {"type": "PING", "target": "ping-us-east.example.test"},
            "relay": {"type": "RELAY", "target": "relay.example.test"}
        }"#,
    );

    let registry = load_regions(&path).unwrap();
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.regions()[0].name, "us-east-1");
}

#[test]
fn test_load_full_response() {
    let dir = TempDir::new().unwrap();
    let path = write_file(
        &dir,
        "response.json",
        r#"{"status": 200, "data": {"regionPingData": {
            "eu-west-1": {"type": "PING", "target": "ping-eu.example.test"},
            "ap-south-1": {"type": "PING", "target": "ping-ap.example.test"}
        }}}"#,
    );

    assert_eq!(load_regions(&path).unwrap().len(), 2);
}

#[test]
fn test_load_errors() {
    let dir = TempDir::new().unwrap();

    let empty = write_file(&dir, "empty.json", "{}");
    assert!(matches!(load_regions(&empty), Err(CliError::NoRegions(_))));

    let broken = write_file(&dir, "broken.json", "{ not json");
    assert!(matches!(load_regions(&broken), Err(CliError::Parse { .. })));

    let missing = dir.path().join("missing.json");
    assert!(matches!(load_regions(&missing), Err(CliError::Read { .. })));
}

#[test]
fn test_render_table_fastest_first() {
    let data = PingData::from([
        ("eu-west-1".to_string(), 80),
        ("us-east-1".to_string(), 25),
        ("ap-southeast-2".to_string(), 999),
    ]);

    assert_eq!(
        render(&data, false).unwrap(),
        "REGION          LATENCY\n\
         us-east-1       25 ms\n\
         eu-west-1       80 ms\n\
         ap-southeast-2  999 ms\n"
    );
}

#[test]
fn test_render_json() {
    let data = PingData::from([("us-east-1".to_string(), 25)]);
    let out = render(&data, true).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed, serde_json::json!({"us-east-1": 25}));
}

#[test]
fn test_ping_against_local_server() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { continue };
            let mut buf = [0_u8; 1024];
            let _ = stream.read(&mut buf);
            let _ = stream
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
        }
    });

    let closed = TcpListener::bind("127.0.0.1:0").unwrap();
    let closed_addr = closed.local_addr().unwrap();
    drop(closed);

    let dir = TempDir::new().unwrap();
    let regions = write_file(
        &dir,
        "regions.json",
        &serde_json::json!({
            "local": {"type": "PING", "target": format!("{addr}")},
            "gone": {"type": "PING", "target": format!("{closed_addr}")}
        })
        .to_string(),
    );

    let mut args = args(regions);
    args.timeout_ms = Some(500);

    let data = cmd_ping(&args).unwrap();
    assert_eq!(data.len(), 2);
    assert!(data["local"] < 999);
    assert_eq!(data["gone"], 999);
}
