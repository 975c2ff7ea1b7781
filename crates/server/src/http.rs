//! HTTP API ingress.
//!
//! Three resources: the dataset download, the recommend endpoint (POST body
//! or GET query parameter; both deployment variants exist in the wild) and
//! the recent-resolutions status endpoint.

use crate::query_log::{PersistencePolicy, QueryLog, QueryLogEntry};
use crate::recent::RecentResults;
use crate::resolver::Resolver;
use actix_cors::Cors;
use actix_web::{App, HttpResponse, HttpServer, Result as ActixResult, web};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use worker_client::QueryFrame;

/// Shared state behind every HTTP handler.
#[derive(Clone)]
pub struct HttpState {
    pub resolver: Resolver,
    pub query_log: Arc<dyn QueryLog>,
    pub dataset_path: PathBuf,
    pub recent: Arc<RecentResults>,
}

#[derive(Deserialize)]
struct RecommendParams {
    producto: Option<String>,
}

pub struct HttpApi;

impl HttpApi {
    /// This ingress persists before answering: a query-log failure gates the
    /// response as a 500 (fail-closed).
    pub const PERSISTENCE_POLICY: PersistencePolicy = PersistencePolicy::LogThenRespond;

    pub async fn start(state: HttpState, port: u16) -> std::io::Result<()> {
        info!("HTTP API listening on :{}", port);
        HttpServer::new(move || {
            let cors = Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header()
                .max_age(3600);

            App::new()
                .wrap(cors)
                .app_data(web::Data::new(state.clone()))
                .configure(routes)
        })
        .bind(("0.0.0.0", port))?
        .run()
        .await
    }
}

/// Route table, shared with the test harness.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/dataset").route(web::get().to(download_dataset)))
        .service(
            web::resource("/api/recomendar")
                .route(web::post().to(recommend_post))
                .route(web::get().to(recommend_get)),
        )
        .service(web::resource("/api/recientes").route(web::get().to(recent_results)));
}

/// Stream the raw CSV report back, as a download.
async fn download_dataset(state: web::Data<HttpState>) -> ActixResult<HttpResponse> {
    let filename = state
        .dataset_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dataset.csv".to_string());

    match tokio::fs::read(&state.dataset_path).await {
        Ok(bytes) => Ok(HttpResponse::Ok()
            .content_type("text/csv")
            .insert_header((
                "Content-Disposition",
                format!("attachment; filename={}", filename),
            ))
            .body(bytes)),
        Err(e) => {
            error!("Dataset file {} unreadable: {}", state.dataset_path.display(), e);
            Ok(HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Dataset unavailable"
            })))
        }
    }
}

async fn recommend_post(
    state: web::Data<HttpState>,
    req: web::Json<QueryFrame>,
) -> ActixResult<HttpResponse> {
    recommend(&state, &req.producto).await
}

async fn recommend_get(
    state: web::Data<HttpState>,
    params: web::Query<RecommendParams>,
) -> ActixResult<HttpResponse> {
    let producto = params.producto.as_deref().unwrap_or("");
    recommend(&state, producto).await
}

async fn recommend(state: &HttpState, producto: &str) -> ActixResult<HttpResponse> {
    if producto.trim().is_empty() {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "error": "Field 'producto' must not be empty"
        })));
    }

    let resultados = state.resolver.resolve(producto).await;

    // Log-then-respond: the append gates the answer.
    let entry = QueryLogEntry::new(producto, resultados.clone());
    if let Err(e) = state.query_log.append(entry).await {
        error!("Failed to persist HTTP query log entry: {}", e);
        return Ok(HttpResponse::InternalServerError().json(serde_json::json!({
            "error": "Failed to record the query"
        })));
    }

    Ok(HttpResponse::Ok().json(resultados))
}

async fn recent_results(state: web::Data<HttpState>) -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(state.recent.snapshot()))
}
