use crate::server::database::connection::Connection;
use crate::server::database::pool_config::PoolConfig;
use anyhow::{anyhow, Context, Error};
use log::{error, info};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time;
use tokio_postgres::{Client, NoTls};

pub(crate) struct CommonPool<C> {
    /// pool name
    name: String,
    /// idle connections, handed out in a FIFO manner
    connections: Mutex<VecDeque<C>>,
    /// one permit per idle connection
    available: Semaphore,
    /// how long `acquire` waits for a connection to come back
    timeout: Duration,
}

/// Bounded pool of database clients. Cloning shares the same pool.
pub(crate) struct Pool<C>(Arc<CommonPool<C>>);

impl<C> Clone for Pool<C> {
    fn clone(&self) -> Pool<C> {
        Pool(self.0.clone())
    }
}

impl<C> Pool<C> {
    /// create an empty pool, fill it with `add`
    pub fn new(name: impl Into<String>, timeout: Duration) -> Self {
        Self(Arc::new(CommonPool {
            name: name.into(),
            connections: Mutex::new(VecDeque::with_capacity(PoolConfig::DEFAULT_SIZE)),
            available: Semaphore::new(0),
            timeout,
        }))
    }

    pub fn add(&self, client: C) {
        self.idle().push_back(client);
        self.0.available.add_permits(1);
    }

    /// number of idle connections
    pub fn idle_count(&self) -> usize {
        self.idle().len()
    }

    /// acquire a connection, bail out if the pool timeout elapses first.
    pub async fn acquire(&self) -> Option<Connection<C>> {
        let sleep = time::sleep(self.0.timeout);
        tokio::pin!(sleep);
        tokio::select! {
            permit = self.0.available.acquire() => {
                // the permit is restored by `add` when the connection is released
                permit.ok()?.forget();
                let client = self.idle().pop_front()?;
                Some(Connection::new(client, self.clone()))
            },
            _ = &mut sleep => {
                error!("pool {} timed out to acquire a connection after {:?}", self.0.name, self.0.timeout);
                None
            },
        }
    }

    pub(crate) fn release(&self, client: C) {
        self.add(client);
    }

    fn idle(&self) -> MutexGuard<'_, VecDeque<C>> {
        self.0.connections.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Pool<Client> {
    /// open `config.size` connections concurrently
    pub async fn connect(name: &str, config: &PoolConfig, timeout: Duration) -> Result<Self, Error> {
        let pool = Self::new(name, timeout);
        let mut set = JoinSet::new();
        for _ in 0..config.size {
            let conn_str = config.conn_str.clone();
            set.spawn(async move {
                let (client, conn) = tokio_postgres::connect(&conn_str, NoTls)
                    .await
                    .context("failed to create connection")?;
                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        error!("connection returned error and aborted, {}", e);
                    }
                });
                Ok::<_, Error>(client)
            });
        }
        while let Some(res) = set.join_next().await {
            match res {
                Ok(Ok(client)) => {
                    info!("connection created");
                    pool.add(client);
                }
                Ok(Err(e)) => error!("{:#}", e),
                Err(e) => error!("join_next failed when joining, {}", e),
            }
        }
        if pool.idle_count() == 0 {
            return Err(anyhow!("pool {} could not open any connection", name));
        }
        Ok(pool)
    }
}
