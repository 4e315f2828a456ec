//! Bounded pool of logical connection handles
//!
//! A handle is a session slot for one request, not a socket. The pool caps
//! the number of requests serviced at once and reuses idle handles.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;
use uuid::Uuid;

use crate::error::PoolError;
use crate::protocol::ClientInfo;

/// Pool size used when the configuration gives none
pub const DEFAULT_MAX_CONNECTIONS: usize = 100;

/// A logical connection handle
#[derive(Debug, Clone)]
pub struct Connection {
    pub id: String,
    pub client: ClientInfo,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    pub session: HashMap<String, Value>,
}

impl Connection {
    fn new(client: &ClientInfo) -> Self {
        let now = Utc::now();
        Self {
            id: format!("conn_{}", Uuid::new_v4().simple()),
            client: client.clone(),
            created_at: now,
            last_active: now,
            session: HashMap::new(),
        }
    }

    pub fn touch(&mut self) {
        self.last_active = Utc::now();
    }
}

/// Read-only snapshot of the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub max_size: usize,
    pub active: usize,
    pub idle: usize,
    /// Handles that can still be acquired
    pub available: usize,
}

struct PoolState {
    idle: VecDeque<Connection>,
    active: usize,
}

/// Connection pool
pub struct ConnectionPool {
    max_size: usize,
    state: Mutex<PoolState>,
}

impl ConnectionPool {
    /// Create a pool; a `max_size` of 0 falls back to the default size
    pub fn new(max_size: usize) -> Self {
        let max_size = if max_size == 0 {
            DEFAULT_MAX_CONNECTIONS
        } else {
            max_size
        };

        Self {
            max_size,
            state: Mutex::new(PoolState {
                idle: VecDeque::with_capacity(max_size),
                active: 0,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take an idle handle or create a new one
    pub fn acquire(&self, client: &ClientInfo) -> Result<Connection, PoolError> {
        let mut state = self.state();

        if state.active >= self.max_size {
            return Err(PoolError::Exhausted {
                max_size: self.max_size,
            });
        }

        let conn = match state.idle.pop_front() {
            Some(mut conn) => {
                if conn.client != *client {
                    conn.client = client.clone();
                    conn.session.clear();
                }
                conn.touch();
                debug!(connection_id = %conn.id, client = %client.name, "Reusing pooled connection");
                conn
            }
            None => {
                let conn = Connection::new(client);
                debug!(connection_id = %conn.id, client = %client.name, "Created new connection");
                conn
            }
        };

        state.active += 1;
        Ok(conn)
    }

    /// Return a handle; it is dropped if the idle set is full
    pub fn release(&self, mut conn: Connection) {
        conn.touch();
        let mut state = self.state();
        state.active = state.active.saturating_sub(1);

        if state.idle.len() < self.max_size {
            debug!(connection_id = %conn.id, "Connection released to pool");
            state.idle.push_back(conn);
        } else {
            debug!(connection_id = %conn.id, "Connection closed (pool full)");
        }
    }

    /// Acquire a handle that goes back to the pool when dropped
    pub fn lease(self: &Arc<Self>, client: &ClientInfo) -> Result<PooledConnection, PoolError> {
        let conn = self.acquire(client)?;
        Ok(PooledConnection {
            conn: Some(conn),
            pool: Arc::clone(self),
        })
    }

    pub fn stats(&self) -> PoolStats {
        let state = self.state();
        PoolStats {
            max_size: self.max_size,
            active: state.active,
            idle: state.idle.len(),
            available: self.max_size.saturating_sub(state.active),
        }
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }
}

/// A leased connection handle
pub struct PooledConnection {
    conn: Option<Connection>,
    pool: Arc<ConnectionPool>,
}

impl Deref for PooledConnection {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        self.conn.as_ref().expect("connection present until drop")
    }
}

impl DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut Connection {
        self.conn.as_mut().expect("connection present until drop")
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.release(conn);
        }
    }
}
