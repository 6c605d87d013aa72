use std::ops::{Deref, DerefMut};
use crate::server::database::pool::Pool;

/// A client checked out of a [`Pool`], handed back when dropped.
pub(crate) struct Connection<C> {
    client: Option<C>,
    pool: Pool<C>,
}

impl<C> Connection<C> {
    pub fn new(client: C, pool: Pool<C>) -> Self {
        Self { client: Some(client), pool }
    }
}

impl<C> Deref for Connection<C> {
    type Target = C;

    fn deref(&self) -> &C {
        self.client.as_ref().expect("connection is only emptied on drop")
    }
}

impl<C> DerefMut for Connection<C> {
    fn deref_mut(&mut self) -> &mut C {
        self.client.as_mut().expect("connection is only emptied on drop")
    }
}

impl<C> Drop for Connection<C> {
    fn drop(&mut self) {
        if let Some(client) = self.client.take() {
            self.pool.release(client);
        }
    }
}
