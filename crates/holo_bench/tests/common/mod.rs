//! In-process RESP nodes for workload integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use redis_protocol::codec::Resp2;
use redis_protocol::resp2::types::BytesFrame;
use tokio::net::TcpListener;
use tokio_util::codec::Framed;

/// How a fake node answers every request.
#[derive(Clone, Copy, Debug)]
pub enum Reply {
    /// `+OK` after the given delay.
    Ok(Duration),
    /// A frame a SET never returns, which the client treats as a failure.
    Garbage,
}

/// Bind a fake node on a free local port and serve it in the background.
pub async fn spawn_resp_node(reply: Reply) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind fake node");
    let addr = listener.local_addr().expect("fake node addr");
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut framed = Framed::new(socket, Resp2::default());
                while let Some(Ok(_request)) = framed.next().await {
                    let resp = match reply {
                        Reply::Ok(delay) => {
                            if !delay.is_zero() {
                                tokio::time::sleep(delay).await;
                            }
                            BytesFrame::SimpleString(Bytes::from_static(b"OK"))
                        }
                        Reply::Garbage => BytesFrame::Integer(0),
                    };
                    if framed.send(resp).await.is_err() {
                        break;
                    }
                }
            });
        }
    });
    addr
}

/// An address nothing is listening on.
pub async fn dead_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    addr
}
