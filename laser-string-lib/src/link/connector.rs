use std::future::Future;
use std::io;

use tokio::io::AsyncWrite;
use tokio::net::TcpStream;

use crate::link::config::LinkConfig;

/// Opens the byte stream a [`LinkManager`](crate::link::LinkManager) writes
/// frames to.
///
/// [`TcpConnector`] is what talks to real hardware; tests plug in simulated
/// transports.
pub trait Connector: Send + Sync {
    type Stream: AsyncWrite + Unpin + Send;

    fn connect(&self, config: &LinkConfig) -> impl Future<Output = io::Result<Self::Stream>> + Send;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    type Stream = TcpStream;

    fn connect(&self, config: &LinkConfig) -> impl Future<Output = io::Result<TcpStream>> + Send {
        let host = config.host.clone();
        let port = config.port;
        async move {
            let stream = TcpStream::connect((host.as_str(), port)).await?;
            // frames are small and nothing is ever read back
            stream.set_nodelay(true)?;
            Ok(stream)
        }
    }
}
