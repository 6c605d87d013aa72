//! main file for the server

mod auth;
mod controller;
pub(crate) mod database;
pub(crate) mod model;
mod policy;
mod routes;
mod service;
mod util;

use std::io;
use actix_web::middleware::{Logger, NormalizePath};
use actix_web::{web, App, HttpServer};
use log::info;
use tokio_postgres::Client;
use crate::server::database::pool::Pool;
use crate::server::database::postgres::PgStore;
use crate::server::model::config::ServerConfig;
use crate::server::routes::configure;

/// Run the server
pub(crate) async fn run(ServerConfig { addr, pool, db_timeout }: ServerConfig) -> io::Result<()> {
    let db_pool = Pool::<Client>::connect("db", &pool, db_timeout)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::ConnectionRefused, format!("{e:#}")))?;
    info!("db pool ready with {} connections", db_pool.idle_count());
    let store = web::Data::new(PgStore::new(db_pool, db_timeout));

    HttpServer::new(move || {
        App::new()
            .wrap(NormalizePath::trim())
            .wrap(Logger::default())
            .app_data(store.clone())
            .configure(configure::<PgStore>)
    })
        .bind(addr)?
        .run()
        .await
}
