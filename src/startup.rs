use actix_web::dev::Server;
use actix_web::{middleware::Logger, web, App, HttpServer};
use std::net::TcpListener;

use crate::auth::LoginHandler;
use crate::configuration::CookiePolicy;
use crate::logger::LoggerMiddleware;
use crate::routes::{health_check, json_error_handler, login};

pub fn run(
    listener: TcpListener,
    login_handler: LoginHandler,
    cookie_policy: CookiePolicy,
) -> Result<Server, std::io::Error> {
    let login_handler = web::Data::new(login_handler);
    let cookie_policy = web::Data::new(cookie_policy);

    let server = HttpServer::new(move || {
        App::new()
            // Global middleware
            .wrap(Logger::default())
            .wrap(LoggerMiddleware)

            // Shared state
            .app_data(login_handler.clone())
            .app_data(cookie_policy.clone())
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))

            .route("/health_check", web::get().to(health_check))
            .route("/auth/login", web::post().to(login))
    })
    .listen(listener)?
    .run();

    Ok(server)
}
