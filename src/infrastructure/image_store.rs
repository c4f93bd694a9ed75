use async_trait::async_trait;
use base64::prelude::*;
use log::{info, warn};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::config::ImageConfig;
use crate::domain::errors::DomainError;
use crate::domain::ports::ImageStore;

/// Unsigned uploads to a Cloudinary-style image CDN. The image is sent as a
/// base64 data URI together with the target folder and upload preset.
pub struct HttpImageStore {
    client: Client,
    config: ImageConfig,
}

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: String,
}

impl HttpImageStore {
    pub fn new(config: ImageConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }
}

fn upstream(e: impl std::fmt::Display) -> DomainError {
    DomainError::Upstream(format!("image upload: {e}"))
}

#[async_trait]
impl ImageStore for HttpImageStore {
    async fn upload(&self, bytes: Vec<u8>, content_type: &str) -> Result<String, DomainError> {
        let url = self
            .config
            .upload_url
            .as_deref()
            .ok_or_else(|| upstream("no upload endpoint configured"))?;

        let file = format!("data:{content_type};base64,{}", BASE64_STANDARD.encode(&bytes));
        let mut body = json!({ "file": file, "folder": self.config.folder });
        if let Some(preset) = &self.config.upload_preset {
            body["upload_preset"] = json!(preset);
        }

        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(upstream)?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            warn!("Image CDN rejected upload with status {status}");
            return Err(upstream(format!("status {status}")));
        }

        let uploaded: UploadResponse = response.json().await.map_err(upstream)?;
        info!("Uploaded {} bytes to {}", bytes.len(), uploaded.secure_url);
        Ok(uploaded.secure_url)
    }
}

#[cfg(test)]
mod tests {
    use actix_web::{web, App, HttpResponse, HttpServer};
    use serde_json::Value;

    use super::*;

    async fn fake_upload(body: web::Json<Value>) -> HttpResponse {
        let file = body["file"].as_str().unwrap_or_default();
        if !file.starts_with("data:image/png;base64,") || body["folder"] != "grabbie/order-proofs" {
            return HttpResponse::BadRequest().finish();
        }
        HttpResponse::Ok().json(json!({ "secure_url": "https://cdn.test/proof.png" }))
    }

    fn config(upload_url: Option<String>) -> ImageConfig {
        ImageConfig {
            upload_url,
            upload_preset: Some("unsigned".to_string()),
            folder: "grabbie/order-proofs".to_string(),
        }
    }

    #[actix_web::test]
    async fn upload_returns_the_cdn_url() {
        let server = HttpServer::new(|| App::new().route("/upload", web::post().to(fake_upload)))
            .workers(1)
            .bind(("127.0.0.1", 0))
            .unwrap();
        let addr = server.addrs()[0];
        actix_web::rt::spawn(server.run());

        let store = HttpImageStore::new(config(Some(format!("http://{addr}/upload"))));
        let url = store.upload(vec![0x89, b'P', b'N', b'G'], "image/png").await.unwrap();

        assert_eq!(url, "https://cdn.test/proof.png");
    }

    #[actix_web::test]
    async fn missing_endpoint_is_an_upstream_failure() {
        let store = HttpImageStore::new(config(None));
        let err = store.upload(vec![1, 2, 3], "image/png").await.unwrap_err();
        assert!(matches!(err, DomainError::Upstream(_)));
    }
}
