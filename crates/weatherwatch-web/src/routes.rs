use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Html,
    routing::get,
    Router,
};
use tower_http::trace::TraceLayer;
use weatherwatch_core::AppError;
use weatherwatch_weather::{WeatherError, WeatherProvider};

use crate::page::{render_page, PageBody};

#[derive(Debug, Clone)]
pub struct AppState {
    provider: WeatherProvider,
    default_city: String,
}

impl AppState {
    pub fn new(provider: WeatherProvider, default_city: impl Into<String>) -> Self {
        Self {
            provider,
            default_city: default_city.into(),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/weather", get(weather))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn weather(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, Html<String>) {
    let notices: Vec<&str> = if params.keys().any(|k| k != "city") {
        vec!["invalid request"]
    } else {
        Vec::new()
    };

    let requested = params
        .get("city")
        .map(|c| c.trim())
        .filter(|c| !c.is_empty());
    let city = match requested.or_else(|| Some(state.default_city.trim()).filter(|c| !c.is_empty())) {
        Some(city) => city,
        None => return (StatusCode::OK, Html(render_page(PageBody::Empty, &notices))),
    };

    match state.provider.fetch_report(city).await {
        Ok(report) => {
            tracing::info!("Served weather for {}", report.name);
            (StatusCode::OK, Html(render_page(PageBody::Report(&report), &notices)))
        }
        Err(e) => {
            tracing::warn!("Weather lookup for {} failed: {}", city, e);
            let status = status_for(&e);
            let message = AppError::from(e).user_message();
            (
                status,
                Html(render_page(PageBody::Error { city, message }, &notices)),
            )
        }
    }
}

fn status_for(error: &WeatherError) -> StatusCode {
    match error {
        WeatherError::CityNotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::BAD_GATEWAY,
    }
}
