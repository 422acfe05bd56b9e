use std::{net::SocketAddr, sync::Arc};

use loop_course::{config::Config, create_router, live_planner, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "loop_course=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().expect("load configuration");
    let planner = live_planner(&config).expect("build HTTP client");
    let settings = config.planner_settings();
    tracing::info!(
        "planner ready: {} waypoints, shrink {:.2}, snap budget {:?}",
        settings.shape.waypoint_count,
        settings.shape.shrink_factor,
        settings.snap_budget
    );

    let state = AppState {
        planner: Arc::new(planner),
    };
    let app = create_router(state);

    let addr: SocketAddr = config.bind_addr.parse().expect("valid socket address");
    tracing::info!("starting course server on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("bind listener");
    axum::serve(listener, app).await.expect("serve");
}
