use actix_cors::Cors;
use actix_web::{
    get, post, web, App, HttpResponse, HttpServer, Responder, Result as ActixResult,
};
use actix_ws::Message;
use serde::Serialize;
use std::sync::Arc;
use tradecore::{ConfigProvider, EngineError};
use tradeengine::{AdapterRegistry, Engine};
use tracing::{error, info};

/// Application state shared across handlers
struct AppState {
    engine: Arc<Engine>,
    config: Arc<ConfigProvider>,
}

/// Error response
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// Health check endpoint
#[get("/health")]
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "OK",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "tradeserver"
    }))
}

/// List configured flows
#[get("/api/flows")]
async fn list_flows(data: web::Data<AppState>) -> ActixResult<impl Responder> {
    let flows: Vec<_> = data
        .config
        .flows()
        .iter()
        .map(|flow| {
            serde_json::json!({
                "id": flow.id,
                "name": flow.name,
                "description": flow.description,
                "steps": flow.steps.len(),
            })
        })
        .collect();

    Ok(HttpResponse::Ok().json(flows))
}

/// Validate and execute a flow
#[post("/v1/execute/{flow_id}")]
async fn execute_flow(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> ActixResult<impl Responder> {
    let flow_id = path.into_inner();

    info!("Executing flow: {}", flow_id);

    match data.engine.execute(&flow_id).await {
        Ok(result) => Ok(HttpResponse::Ok().json(result)),
        Err(err @ EngineError::FlowNotFound(_)) => {
            Ok(HttpResponse::NotFound().json(ErrorResponse {
                error: err.to_string(),
            }))
        }
        Err(err) => {
            error!("Flow {} failed: {}", flow_id, err);
            Ok(HttpResponse::InternalServerError().json(ErrorResponse {
                error: format!("Execution of flow '{flow_id}' failed: {err}"),
            }))
        }
    }
}

/// WebSocket endpoint for real-time execution events
#[get("/api/events")]
async fn websocket_events(
    req: actix_web::HttpRequest,
    stream: web::Payload,
    data: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    let (res, mut session, mut msg_stream) = actix_ws::handle(&req, stream)?;

    info!("WebSocket client connected");

    let mut events = data.engine.event_bus().subscribe();

    actix_web::rt::spawn(async move {
        loop {
            tokio::select! {
                event = events.recv() => {
                    match event {
                        Ok(event) => {
                            if let Ok(json) = serde_json::to_string(&event) {
                                if session.text(json).await.is_err() {
                                    break;
                                }
                            }
                        }
                        Err(_) => break,
                    }
                }

                Some(Ok(msg)) = msg_stream.recv() => {
                    match msg {
                        Message::Ping(bytes) => {
                            if session.pong(&bytes).await.is_err() {
                                break;
                            }
                        }
                        Message::Close(_) => break,
                        _ => {}
                    }
                }

                else => break,
            }
        }

        info!("WebSocket client disconnected");
        let _ = session.close(None).await;
    });

    Ok(res)
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    info!("Starting trade flow server");

    let config_path =
        std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());
    let config = Arc::new(ConfigProvider::from_path(&config_path)?);

    let mut registry = AdapterRegistry::new();
    tradeadapters::register_all(&mut registry, Arc::clone(&config));

    let mut engine = Engine::new(Arc::clone(&config), registry);
    if let Err(err) = engine.init().await {
        error!("Failed to initialize engine: {}", err);
        anyhow::bail!("engine boot failed: {err}");
    }

    info!("Engine initialized with all configured adapters");

    let app_state = web::Data::new(AppState {
        engine: Arc::new(engine),
        config,
    });

    let bind_address =
        std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

    info!("Server starting on http://{}", bind_address);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(app_state.clone())
            .wrap(cors)
            .wrap(actix_web::middleware::Logger::default())
            .service(health_check)
            .service(list_flows)
            .service(execute_flow)
            .service(websocket_events)
    })
    .bind(&bind_address)?
    .run()
    .await?;

    Ok(())
}
