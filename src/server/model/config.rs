use std::net::SocketAddrV4;
use std::time::Duration;
use crate::server::database::pool_config::PoolConfig;

/// Server configs
#[derive(Debug)]
pub(crate) struct ServerConfig {
    pub addr: SocketAddrV4,
    pub pool: PoolConfig,
    /// upper bound for acquiring a connection and for each query
    pub db_timeout: Duration,
}

impl ServerConfig {
    pub fn new(addr: SocketAddrV4, pool: PoolConfig, db_timeout: Duration) -> Self {
        Self {
            addr,
            pool,
            db_timeout,
        }
    }
}
