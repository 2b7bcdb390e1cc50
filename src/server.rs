use actix_web::{App, HttpResponse, HttpServer, Responder, get, post, web};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

use crate::config::Settings;
use crate::driver::Browser;
use crate::engine::{HarvestRequest, ReviewHarvester, SourceSelection};
use crate::model::DateWindow;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub browser: Arc<dyn Browser>,
    /// Mode the shared browser was started in. Fixed for the process.
    pub headless: bool,
}

// -------------------------
// Request Types
// -------------------------

#[derive(Debug, Deserialize)]
pub struct HarvestParams {
    company: String,
    start_date: String,
    end_date: String,
    /// `g2`, `capterra`, `trustradius`, a comma list, or `all` (default).
    #[serde(default)]
    source: Option<String>,
    /// Must match the service's own browser mode when given.
    #[serde(default)]
    headless: Option<bool>,
}

impl HarvestParams {
    fn to_request(&self, service_headless: bool) -> Result<HarvestRequest, String> {
        if let Some(asked) = self.headless.filter(|h| *h != service_headless) {
            return Err(format!(
                "headless={asked} is not available: this service's browser runs with headless={service_headless}"
            ));
        }
        let company = self.company.trim();
        if company.is_empty() {
            return Err("company is required".to_string());
        }
        let window = DateWindow::parse(&self.start_date, &self.end_date).map_err(|e| e.to_string())?;
        let selection: SourceSelection = self.source.as_deref().unwrap_or("all").parse()?;
        Ok(HarvestRequest {
            company: company.to_string(),
            window,
            selection,
            headless: service_headless,
        })
    }
}

fn bad_request(msg: impl Into<String>) -> HttpResponse {
    HttpResponse::BadRequest().json(json!({ "error": msg.into() }))
}

// -------------------------
// HTTP Handlers
// -------------------------

#[get("/")]
async fn index() -> impl Responder {
    HttpResponse::Ok().body(
        "Review claw online.\n\
         JSON:\n  POST /harvest {\"company\":\"Acme\",\"start_date\":\"2023-01-01\",\"end_date\":\"2023-12-31\",\"source\":\"all\"}\n  GET  /harvest?company=Acme&start_date=2023-01-01&end_date=2023-12-31&source=g2\n\
         Stream:\n  GET  /harvest/stream?company=...&start_date=...&end_date=... (SSE)\n\
         The browser mode is set when the service starts; a request may only repeat it via \"headless\".",
    )
}

#[get("/healthz")]
async fn healthz() -> impl Responder {
    HttpResponse::Ok().body("ok")
}

async fn respond(state: &AppState, params: &HarvestParams) -> HttpResponse {
    let req = match params.to_request(state.headless) {
        Ok(r) => r,
        Err(e) => return bad_request(e),
    };
    let harvester = ReviewHarvester::new(state.browser.as_ref(), &state.settings);
    match harvester.run(&req).await {
        Ok(report) => HttpResponse::Ok().json(report),
        Err(e) => bad_request(format!("{e:#}")),
    }
}

#[post("/harvest")]
async fn harvest_post(state: web::Data<AppState>, body: web::Json<HarvestParams>) -> impl Responder {
    respond(&state, &body).await
}

#[get("/harvest")]
async fn harvest_get(state: web::Data<AppState>, q: web::Query<HarvestParams>) -> impl Responder {
    respond(&state, &q).await
}

// --------------
// SSE streaming
// --------------

fn sse_event(event: &str, data_json: &str) -> Bytes {
    let payload = format!("event: {}\ndata: {}\n\n", event, data_json);
    Bytes::from(payload)
}

#[get("/harvest/stream")]
async fn harvest_stream(state: web::Data<AppState>, q: web::Query<HarvestParams>) -> impl Responder {
    let (tx, mut rx) = mpsc::unbounded_channel::<Bytes>();
    let params = q.into_inner();
    let state = state.into_inner();

    actix_web::rt::spawn(async move {
        let req = match params.to_request(state.headless) {
            Ok(r) => r,
            Err(e) => {
                let _ = tx.send(sse_event("error", &json!({ "error": e }).to_string()));
                return;
            }
        };

        let ids: Vec<&str> = req.selection.ids().into_iter().map(|id| id.as_str()).collect();
        let _ = tx.send(sse_event(
            "start",
            &json!({ "company": req.company, "sources": ids }).to_string(),
        ));

        let harvester = ReviewHarvester::new(state.browser.as_ref(), &state.settings);
        let progress = tx.clone();
        let outcome = harvester
            .run_with_progress(&req, |tally| {
                let _ = progress.send(sse_event("source", &json!(tally).to_string()));
            })
            .await;

        let _ = match outcome {
            Ok(report) => tx.send(sse_event("done", &json!(report).to_string())),
            Err(e) => tx.send(sse_event(
                "error",
                &json!({ "error": format!("{e:#}") }).to_string(),
            )),
        };
    });

    let stream = async_stream::stream! {
        while let Some(chunk) = rx.recv().await {
            yield Ok::<Bytes, actix_web::Error>(chunk);
        }
    };

    HttpResponse::Ok()
        .insert_header(("Content-Type", "text/event-stream"))
        .insert_header(("Cache-Control", "no-cache"))
        .insert_header(("Connection", "keep-alive"))
        .streaming(stream)
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(index)
        .service(healthz)
        .service(harvest_stream)
        .service(harvest_post)
        .service(harvest_get);
}

pub async fn serve(bind: &str, state: AppState) -> std::io::Result<()> {
    info!(bind, "starting review claw service");
    let data = web::Data::new(state);
    HttpServer::new(move || App::new().app_data(data.clone()).configure(configure))
        .bind(bind)?
        .run()
        .await
}
