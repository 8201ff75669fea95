use error::AppError;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    app::run().await
}

mod api;
mod app;
mod auth;
mod dto;
mod error;
mod models;
mod realtime;
mod repositories;
mod telemetry;
mod usecases;
