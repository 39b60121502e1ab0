use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use sqlx::PgPool;

use todolite::auth::AuthMiddleware;
use todolite::config::Config;
use todolite::reminder::{self, EmailClient};
use todolite::routes;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let config = Config::from_env();

    let pool = PgPool::connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run database migrations");

    // The reminder scanner runs as one background task; without mailer
    // credentials the API still serves requests.
    match EmailClient::from_env() {
        Some(client) => {
            reminder::spawn_daily(pool.clone(), client, config.reminder_hour);
        }
        None => log::warn!("EMAIL_API_URL/EMAIL_API_KEY/EMAIL_FROM not set; daily reminders disabled"),
    }

    log::info!("Starting todolite server at {}", config.server_url());

    let server_pool = pool.clone();
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(server_pool.clone()))
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(Logger::default())
            .service(routes::health::health)
            .service(
                web::scope("/api")
                    .wrap(AuthMiddleware)
                    .configure(routes::config),
            )
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .run()
    .await
}
