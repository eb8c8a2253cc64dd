//! RESP2 session against HoloStore nodes.
//!
//! Each host keeps a small list of idle connections. An attempt checks one
//! out and only returns it after a complete request/response exchange, so a
//! connection whose attempt was abandoned mid-flight is closed rather than
//! reused with a stale reply pending.

use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use holo_exec::{AttemptError, ConnectionError, HostId, Session};
use redis_protocol::codec::Resp2;
use redis_protocol::resp2::types::BytesFrame;
use tokio::net::TcpStream;
use tokio::time;
use tokio_util::codec::Framed;
use tracing::{info, warn};

type Conn = Framed<TcpStream, Resp2>;

/// Upper bound on idle connections kept per host.
const MAX_IDLE_PER_HOST: usize = 64;

/// One generated write: `SET <key> <value>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteStatement {
    pub key: String,
    pub value: String,
}

impl WriteStatement {
    /// Build a RESP SET request frame.
    fn to_frame(&self) -> BytesFrame {
        BytesFrame::Array(vec![
            BytesFrame::BulkString(Bytes::from_static(b"SET")),
            BytesFrame::BulkString(Bytes::from(self.key.as_bytes().to_vec())),
            BytesFrame::BulkString(Bytes::from(self.value.as_bytes().to_vec())),
        ])
    }
}

impl fmt::Display for WriteStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SET {} {}", self.key, self.value)
    }
}

struct HostPool {
    addr: SocketAddr,
    idle: Mutex<Vec<Conn>>,
}

impl HostPool {
    fn checkout(&self) -> Option<Conn> {
        self.idle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop()
    }

    fn checkin(&self, conn: Conn) {
        let mut idle = self
            .idle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if idle.len() < MAX_IDLE_PER_HOST {
            idle.push(conn);
        }
    }
}

/// [`Session`] issuing writes over RESP2 to a fixed set of reachable seeds.
pub struct RespSession {
    hosts: Vec<HostId>,
    pools: HashMap<HostId, HostPool>,
    connect_timeout: Duration,
}

impl RespSession {
    /// Dial every seed once; unreachable seeds are dropped from the session.
    ///
    /// Fails only when no seed can be reached at all.
    pub async fn connect(
        seeds: &[SocketAddr],
        connect_timeout: Duration,
    ) -> Result<Self, ConnectionError> {
        if seeds.is_empty() {
            return Err(ConnectionError::NoHosts);
        }

        let mut hosts = Vec::with_capacity(seeds.len());
        let mut pools = HashMap::with_capacity(seeds.len());
        let mut failures = Vec::new();
        for &addr in seeds {
            match connect(addr, connect_timeout).await {
                Ok(conn) => {
                    let host = HostId::from(addr);
                    info!(host = %host, "connected to seed");
                    hosts.push(host.clone());
                    pools.insert(
                        host,
                        HostPool {
                            addr,
                            idle: Mutex::new(vec![conn]),
                        },
                    );
                }
                Err(reason) => {
                    warn!(seed = %addr, error = %reason, "seed unreachable");
                    failures.push(format!("{addr}: {reason}"));
                }
            }
        }

        if hosts.is_empty() {
            return Err(ConnectionError::Unreachable {
                seeds: seeds.len(),
                reasons: failures.join("; "),
            });
        }

        Ok(Self {
            hosts,
            pools,
            connect_timeout,
        })
    }
}

#[async_trait]
impl Session for RespSession {
    type Statement = WriteStatement;

    fn hosts(&self) -> Vec<HostId> {
        self.hosts.clone()
    }

    async fn execute(
        &self,
        host: &HostId,
        statement: &WriteStatement,
    ) -> Result<u64, AttemptError> {
        let pool = self
            .pools
            .get(host)
            .ok_or_else(|| AttemptError::failed(host, "host not part of session"))?;

        let mut conn = match pool.checkout() {
            Some(conn) => conn,
            None => connect(pool.addr, self.connect_timeout)
                .await
                .map_err(|reason| AttemptError::failed(host, reason))?,
        };

        conn.send(statement.to_frame())
            .await
            .map_err(|err| AttemptError::failed(host, format!("send failed: {err}")))?;

        let resp = match conn.next().await {
            Some(Ok(frame)) => frame,
            Some(Err(err)) => {
                return Err(AttemptError::failed(host, format!("recv failed: {err}")));
            }
            None => return Err(AttemptError::failed(host, "connection closed")),
        };

        // The exchange completed, so the connection is clean regardless of the reply.
        pool.checkin(conn);
        parse_set_response(resp).map_err(|reason| AttemptError::failed(host, reason))
    }
}

async fn connect(node: SocketAddr, connect_timeout: Duration) -> Result<Conn, String> {
    let socket = match time::timeout(connect_timeout, TcpStream::connect(node)).await {
        Ok(Ok(socket)) => socket,
        Ok(Err(err)) => return Err(format!("connect to {node}: {err}")),
        Err(_) => return Err(format!("connect to {node} timed out")),
    };
    socket.set_nodelay(true).ok();
    Ok(Framed::new(socket, Resp2::default()))
}

/// Interpret a RESP SET response; a write produces no rows.
fn parse_set_response(resp: BytesFrame) -> Result<u64, String> {
    match resp {
        BytesFrame::SimpleString(s) if s.as_ref() == b"OK" => Ok(0),
        BytesFrame::Error(err) => Err(err.to_string()),
        other => Err(format!("unexpected SET response: {other:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statement_renders_as_set_command() {
        let stmt = WriteStatement {
            key: "tweet_ab".to_string(),
            value: "42".to_string(),
        };
        assert_eq!(stmt.to_string(), "SET tweet_ab 42");
        match stmt.to_frame() {
            BytesFrame::Array(parts) => {
                assert_eq!(parts.len(), 3);
                assert!(matches!(&parts[0], BytesFrame::BulkString(cmd) if cmd.as_ref() == b"SET"));
            }
            other => panic!("expected array frame, got {other:?}"),
        }
    }

    #[test]
    fn set_responses_are_classified() {
        assert_eq!(
            parse_set_response(BytesFrame::SimpleString(Bytes::from_static(b"OK"))),
            Ok(0)
        );
        assert!(parse_set_response(BytesFrame::Null).is_err());
        assert!(parse_set_response(BytesFrame::Integer(1)).is_err());
    }
}
