use std::sync::Arc;

use actix_web::{web, App, HttpResponse, HttpServer};
use serde_json::json;

use crate::{
    models::{TryOnProxyRequest, TryOnProxyResponse},
    proxy::TryOnProxy,
};

/// Request bodies carry two base64 images.
const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::PayloadConfig::new(MAX_BODY_BYTES))
        .route("/api/try-on", web::post().to(try_on))
        .route("/health", web::get().to(health))
        .route("/blobs/{file_id:.*}", web::get().to(blob));
}

pub async fn run(proxy: TryOnProxy, port: u16) -> std::io::Result<()> {
    let proxy = web::Data::from(Arc::new(proxy));
    log::info!("🌐 Try-on proxy listening on http://0.0.0.0:{}", port);

    HttpServer::new(move || App::new().app_data(proxy.clone()).configure(configure))
        .bind(("0.0.0.0", port))?
        .run()
        .await
}

/// Failures travel in the body; the status is always 200.
async fn try_on(proxy: web::Data<TryOnProxy>, body: web::Bytes) -> HttpResponse {
    let response = match serde_json::from_slice::<TryOnProxyRequest>(&body) {
        Ok(request) => proxy.handle(request).await,
        Err(e) => {
            log::warn!("Unreadable try-on request: {}", e);
            TryOnProxyResponse::rejected(format!("invalid request body: {}", e))
        }
    };
    HttpResponse::Ok().json(response)
}

/// Serves results the proxy offloaded to blob storage.
async fn blob(proxy: web::Data<TryOnProxy>, file_id: web::Path<String>) -> HttpResponse {
    let file_id = file_id.into_inner();
    match proxy.storage().download(&file_id).await {
        Ok(Some(bytes)) => {
            let mime = mime_guess::from_path(&file_id).first_or_octet_stream();
            HttpResponse::Ok()
                .content_type(mime.essence_str())
                .body(bytes)
        }
        Ok(None) => HttpResponse::NotFound().finish(),
        Err(e) => {
            log::warn!("Blob {} not served: {}", file_id, e);
            HttpResponse::BadRequest().json(json!({"error": e.to_string()}))
        }
    }
}

async fn health(proxy: web::Data<TryOnProxy>) -> HttpResponse {
    match proxy.storage().health_check().await {
        Ok(true) => HttpResponse::Ok().json(json!({"status": "ok"})),
        Ok(false) => HttpResponse::ServiceUnavailable().json(json!({"status": "degraded"})),
        Err(e) => HttpResponse::ServiceUnavailable()
            .json(json!({"status": "error", "error": e.to_string()})),
    }
}
