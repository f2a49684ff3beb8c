use onboard::config::{CONFIG_ENV, Config, Limits, PORT_ENV};

#[test]
fn test_config_defaults() {
    let cfg = Config::default();

    assert_eq!(cfg.port(), 80);
    assert!(cfg.server.ipv4);
    assert!(!cfg.server.ipv6);
    assert_eq!(cfg.server.workers, 3);
    assert_eq!(cfg.limits, Limits::default());
    assert_eq!(cfg.limits.menu_capacity, 256);
    assert_eq!(cfg.limits.header_capacity, 1024);
    assert_eq!(cfg.limits.send_chunk, 1024);
    assert!(cfg.tls.is_none());
}

#[test]
fn test_config_from_yaml_partial_sections() {
    let cfg = Config::from_yaml(
        "server:\n  port: 8080\n  workers: 5\nportal:\n  banner: Acme\n  access_point: false\n",
    )
    .unwrap();

    assert_eq!(cfg.port(), 8080);
    assert_eq!(cfg.server.workers, 5);
    assert!(cfg.server.ipv4);
    assert_eq!(cfg.portal.banner, "Acme");
    assert!(!cfg.portal.access_point);
    assert_eq!(cfg.limits.menu_capacity, 256);
}

#[test]
fn test_config_tls_switches_default_port() {
    let cfg = Config::from_yaml(
        "tls:\n  server_cert: /etc/onboard/cert.pem\n  private_key: /etc/onboard/key.pem\n",
    )
    .unwrap();

    assert_eq!(cfg.port(), 443);
    assert!(cfg.tls.as_ref().unwrap().ca_cert.is_none());
}

#[test]
fn test_config_empty_document() {
    let cfg = Config::from_yaml("").unwrap();

    assert_eq!(cfg.port(), 80);
}

#[test]
fn test_config_rejects_zero_workers() {
    assert!(Config::from_yaml("server:\n  workers: 0\n").is_err());
}

#[test]
fn test_config_rejects_no_address_family() {
    assert!(Config::from_yaml("server:\n  ipv4: false\n  ipv6: false\n").is_err());
}

#[test]
fn test_config_clone() {
    let cfg1 = Config::from_yaml("server:\n  port: 8000\n").unwrap();
    let cfg2 = cfg1.clone();
    assert_eq!(cfg1.port(), cfg2.port());
}

// Environment variables are process-wide, so all env handling lives in one test.
#[test]
fn test_config_load_from_env() {
    let dir = std::env::temp_dir().join(format!("onboard-config-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("onboard.yaml");
    std::fs::write(&path, "server:\n  port: 8081\n  workers: 2\n").unwrap();

    unsafe {
        std::env::remove_var(PORT_ENV);
        std::env::set_var(CONFIG_ENV, &path);
    }
    let cfg = Config::load().unwrap();
    assert_eq!(cfg.port(), 8081);
    assert_eq!(cfg.server.workers, 2);

    unsafe {
        std::env::set_var(PORT_ENV, "3000");
    }
    assert_eq!(Config::load().unwrap().port(), 3000);

    unsafe {
        std::env::set_var(PORT_ENV, "not-a-port");
    }
    assert!(Config::load().is_err());

    unsafe {
        std::env::remove_var(PORT_ENV);
        std::env::remove_var(CONFIG_ENV);
    }
    assert_eq!(Config::load().unwrap().port(), 80);

    std::fs::remove_dir_all(&dir).unwrap();
}
