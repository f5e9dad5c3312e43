use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tempfile::TempDir;
use tokio::net::TcpListener;

use storefront_rs::{build_api_state, config::StorageConfig, create_app, Metrics};

pub struct TestEnvironment {
    pub client: Client,
    pub base_url: String,
    pub data_dir: TempDir,
}

impl TestEnvironment {
    /// Start the service over empty collection files in a fresh directory
    pub async fn new() -> Self {
        let data_dir = TempDir::new().expect("Failed to create data directory");
        Self::start(data_dir).await
    }

    /// Start the service over pre-seeded collection files
    pub async fn with_collections(products: Value, carts: Value) -> Self {
        let data_dir = TempDir::new().expect("Failed to create data directory");
        write_json(&data_dir.path().join("products.json"), &products);
        write_json(&data_dir.path().join("carts.json"), &carts);
        Self::start(data_dir).await
    }

    /// Start a second server instance over the same collection files
    pub async fn restart(self) -> Self {
        Self::start(self.data_dir).await
    }

    pub fn products_file(&self) -> PathBuf {
        self.data_dir.path().join("products.json")
    }

    pub fn carts_file(&self) -> PathBuf {
        self.data_dir.path().join("carts.json")
    }

    pub fn read_products_file(&self) -> Value {
        read_json(&self.products_file())
    }

    pub fn read_carts_file(&self) -> Value {
        read_json(&self.carts_file())
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn start(data_dir: TempDir) -> Self {
        let storage = StorageConfig {
            products_file: data_dir.path().join("products.json"),
            carts_file: data_dir.path().join("carts.json"),
            create_missing_files: true,
        };

        let metrics = Arc::new(Metrics::new().expect("Failed to create metrics"));
        let api_state = build_api_state(&storage, metrics.clone())
            .await
            .expect("Failed to build services");
        let app = create_app(metrics, api_state, 1024 * 1024);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind listener");
        let addr = listener.local_addr().expect("Failed to get local address");
        let base_url = format!("http://{}", addr);

        tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("Failed to serve app");
        });

        // Wait for server to start
        tokio::time::sleep(Duration::from_millis(50)).await;

        Self {
            client: Client::new(),
            base_url,
            data_dir,
        }
    }
}

pub fn write_json(path: &std::path::Path, value: &Value) {
    std::fs::write(path, serde_json::to_string_pretty(value).unwrap())
        .expect("Failed to write collection file");
}

pub fn read_json(path: &std::path::Path) -> Value {
    let content = std::fs::read_to_string(path).expect("Failed to read collection file");
    serde_json::from_str(&content).expect("Collection file is not valid JSON")
}
