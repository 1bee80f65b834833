//! Shared utilities for gateway integration tests.

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use legacy_gateway::config::GatewayConfig;
use legacy_gateway::legacy::translator::files_entry;
use legacy_gateway::legacy::{LegacyApplication, LegacyEnvironment, LegacyError, Value};
use legacy_gateway::{HttpServer, Shutdown};
use tempfile::TempDir;

/// Application double: dumps its tables as JSON and obeys a few GET switches.
///
/// - `status=<line>` emits a `Status:` header
/// - `fail=<msg>` returns an application failure after partial output
/// - `move_to=<path>` moves the `doc` upload there
#[allow(dead_code)]
pub struct DumpApp;

impl LegacyApplication for DumpApp {
    fn run(&self, env: &mut LegacyEnvironment) -> Result<(), LegacyError> {
        use std::io::Write;

        let get = |name: &str| env.get.get(name).and_then(Value::as_str).map(str::to_string);
        let (fail, status, move_to) = (get("fail"), get("status"), get("move_to"));

        if let Some(message) = fail {
            write!(env, "half a page")?;
            return Err(LegacyError::Failed(message));
        }
        if let Some(status) = status {
            env.header(format!("Status: {}", status), true);
        }

        let mut moved = false;
        if let Some(target) = move_to {
            if let Some(entry) = files_entry(&env.files, "doc") {
                moved = env.move_uploaded_file(Path::new(&entry.tmp_name), Path::new(&target))?;
            }
        }
        let forged = env.is_uploaded_file(Path::new("/etc/passwd"));

        env.header("Content-Type: application/json", true);
        env.header("Set-Cookie: frontend=abc", false);
        env.header("Set-Cookie: store=default", false);

        let dump = serde_json::json!({
            "server": env.server,
            "get": env.get,
            "post": env.post,
            "request": env.request,
            "cookie": env.cookie,
            "files": env.files,
            "input": String::from_utf8_lossy(env.input()),
            "moved": moved,
            "forged": forged,
        });
        write!(env, "{}", dump)?;
        Ok(())
    }
}

/// A document root laid out like a small shop install.
#[allow(dead_code)]
pub fn docroot() -> TempDir {
    let root = tempfile::tempdir().unwrap();
    fs::create_dir_all(root.path().join("skin/frontend")).unwrap();
    fs::create_dir_all(root.path().join("media/catalog")).unwrap();
    fs::write(root.path().join("skin/frontend/styles.css"), "body { color: #333; }").unwrap();
    fs::write(root.path().join("index.php"), "<?php require 'app/Mage.php';").unwrap();
    root
}

/// Config pointing at `root`, listening on `addr`.
#[allow(dead_code)]
pub fn gateway_config(addr: SocketAddr, root: &Path, uploads: PathBuf) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = addr.to_string();
    config.application.document_root = root.to_path_buf();
    config.application.upload_tmp_dir = uploads;
    config.timeouts.request_secs = 10;
    config
}

/// Starts the gateway in the background; trigger the returned handle to stop it.
#[allow(dead_code)]
pub async fn start_gateway(config: GatewayConfig, application: Arc<dyn LegacyApplication>) -> Shutdown {
    let listener = tokio::net::TcpListener::bind(&config.listener.bind_address)
        .await
        .unwrap();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let server = HttpServer::new(config, application);

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });
    shutdown
}

/// Non-pooled client that ignores proxy settings from the environment.
#[allow(dead_code)]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
