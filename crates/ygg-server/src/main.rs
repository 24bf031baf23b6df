//! Yggdrasil show server binary.
//!
//! Hosts a single active show (spec.md's Non-goals: "multi-show tenancy
//! beyond a single active show per process") behind one WebSocket endpoint,
//! backed by the single-writer `ShowActor` command queue (spec.md §5).

mod connection;
mod registry;
mod show;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::web;
use actix_web::App;
use actix_web::HttpResponse;
use actix_web::HttpServer;
use actix_web::Responder;
use ygg_assignment::AdjacencyGraph;
use ygg_assignment::NullGraph;
use ygg_assignment::TheaterRowsGraph;
use ygg_core::ShowConfig;
use ygg_core::ShowState;
use ygg_core::ID;
use ygg_persistence::InMemoryStore;
use ygg_persistence::Store;

use crate::show::ShowActor;

/// Dual terminal+file logging, matching the teacher's `rbp_core::log()`
/// convention (timestamped file under `logs/`, INFO to terminal, DEBUG to
/// file).
fn init_logging() {
    std::fs::create_dir_all("logs").expect("create logs directory");
    let config = simplelog::ConfigBuilder::new()
        .set_location_level(log::LevelFilter::Off)
        .set_target_level(log::LevelFilter::Off)
        .set_thread_level(log::LevelFilter::Off)
        .build();
    let time = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("time moves forward")
        .as_secs();
    let file = simplelog::WriteLogger::new(
        log::LevelFilter::Debug,
        config.clone(),
        std::fs::File::create(format!("logs/{time}.log")).expect("create log file"),
    );
    let term = simplelog::TermLogger::new(
        log::LevelFilter::Info,
        config,
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );
    simplelog::CombinedLogger::init(vec![term, file]).expect("initialize logger");
}

/// Deterministically derives an `ID<Show>` from the `SHOW_ID` env var so the
/// same show name always resolves to the same snapshot row across restarts.
fn show_id_from_name(name: &str) -> ID<ygg_core::Show> {
    ID::from(uuid::Uuid::new_v5(&uuid::Uuid::NAMESPACE_DNS, name.as_bytes()))
}

/// Builds the seat-adjacency strategy from `ADJACENCY_GRAPH` (`theater` by
/// default, `none` for standing-room venues with no fixed seating; spec.md
/// §4.1).
fn adjacency_graph_from_env() -> Box<dyn AdjacencyGraph + Send + Sync> {
    match std::env::var("ADJACENCY_GRAPH").as_deref() {
        Ok("none") => Box::new(NullGraph),
        _ => Box::new(TheaterRowsGraph),
    }
}

#[cfg(feature = "database")]
async fn open_store() -> Arc<dyn Store> {
    Arc::new(ygg_persistence::PostgresStore::connect_from_env().await)
}
#[cfg(not(feature = "database"))]
async fn open_store() -> Arc<dyn Store> {
    Arc::new(InMemoryStore::new())
}

async fn health() -> impl Responder {
    HttpResponse::Ok().body("ok")
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    init_logging();

    let show_name = std::env::var("SHOW_ID").unwrap_or_else(|_| "default-show".to_string());
    let show_id = show_id_from_name(&show_name);
    let bind_addr = std::env::var("BIND_ADDR").expect("BIND_ADDR must be set");

    let store = open_store().await;
    let initial_state = match store.load_state(show_id).await {
        Ok(Some(state)) => {
            log::info!("resumed show {show_name} at version {}", state.version);
            state
        }
        Ok(None) => {
            log::info!("no snapshot found for show {show_name}, starting fresh");
            ShowState::create_initial(ShowConfig::default(), show_id)
        }
        Err(error) => {
            log::error!("failed to load show {show_name}: {error}, starting fresh");
            ShowState::create_initial(ShowConfig::default(), show_id)
        }
    };

    let graph = adjacency_graph_from_env();
    let (handle, _shared_state) = ShowActor::spawn(initial_state, store, graph);
    let handle = web::Data::new(handle);

    log::info!("starting yggdrasil server on {bind_addr}");
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::new("%r %s %Ts"))
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header(),
            )
            .app_data(handle.clone())
            .route("/health", web::get().to(health))
            .route("/ws", web::get().to(connection::ws_route))
    })
    .bind(bind_addr)?
    .run()
    .await
}
