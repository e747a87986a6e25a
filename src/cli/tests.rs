//! Unit tests for CLI commands

use super::commands::render_routes;
use crate::cli::{build_service, Cli, Commands};
use crate::config::HostConfig;
use crate::description::InstanceMode;
use clap::Parser;

#[test]
fn test_serve_command_parses() {
    let cli = Cli::try_parse_from(["resthost", "serve", "--config", "host.yaml", "--addr", "0.0.0.0:8080"])
        .unwrap();
    match cli.command {
        Commands::Serve { config, addr } => {
            assert_eq!(config.unwrap().to_string_lossy(), "host.yaml");
            assert_eq!(addr.as_deref(), Some("0.0.0.0:8080"));
        }
        other => panic!("Expected Serve command, got {other:?}"),
    }
}

#[test]
fn test_routes_command_parses() {
    let cli = Cli::try_parse_from(["resthost", "routes", "-c", "host.yaml"]).unwrap();
    assert!(matches!(cli.command, Commands::Routes { config: Some(_) }));
}

#[test]
fn test_unknown_command_rejected() {
    assert!(Cli::try_parse_from(["resthost", "generate"]).is_err());
}

#[test]
fn test_build_service_uses_default_addr() {
    let service = build_service(&HostConfig::default(), None, None).unwrap();
    assert_eq!(service.endpoints().len(), 1);
    assert_eq!(&**service.endpoints()[0].base_uri(), "http://127.0.0.1:9200/");
    assert!(!service.is_running());
}

#[test]
fn test_build_service_from_config() {
    let config = HostConfig::from_yaml_str(
        "service:\n  name: calc\n  instancing: per_call\nendpoints:\n  - base_uri: http://+:8080/calc\nthrottling:\n  max_concurrency: 4\n",
    )
    .unwrap();
    let service = build_service(&config, Some("127.0.0.1:8081"), None).unwrap();
    assert_eq!(service.name(), "calc");
    assert_eq!(service.instancing(), InstanceMode::PerCall);
    assert_eq!(service.endpoints().len(), 2);
    assert_eq!(service.descriptor().behaviors().len(), 1);
}

#[test]
fn test_routes_listing() {
    let service = build_service(&HostConfig::default(), None, None).unwrap();
    let listing = render_routes(&service);
    assert!(listing.contains("http://127.0.0.1:9200/ [SampleContract]"));
    assert!(listing.contains(r"^/?add/(\d*?)/(\d*?)$"));
    assert!(listing.contains("DELETE"));
}
