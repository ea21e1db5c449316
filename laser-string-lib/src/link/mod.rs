use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use bytes::Bytes;
use futures::future::BoxFuture;
use log::{debug, warn};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tokio::time::timeout;

use crate::error::{Error, Result, TransportAction};
use crate::frame::{ColorTokens, Frame, FrameOptions};
use crate::led::color::ColorResolver;

pub mod config;
pub mod connector;

pub use config::LinkConfig;
pub use connector::{Connector, TcpConnector};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connected,
}

/// An open connection to the controller, only reachable inside
/// [`LinkManager::with_link`].
pub struct Link<S> {
    stream: S,
    endpoint: String,
    timeout: Duration,
    bytes_written: usize,
}

impl<S: AsyncWrite + Unpin + Send> Link<S> {
    /**
    Writes one encoded frame.

    # Return
    Returns the number of bytes written.
     */
    pub async fn write_frame(&mut self, frame: &Frame) -> Result<usize> {
        self.write_raw(&frame.to_bytes()).await
    }

    /// Writes pre-encoded bytes as-is and flushes them.
    pub async fn write_raw(&mut self, bytes: &[u8]) -> Result<usize> {
        let stream = &mut self.stream;
        let written = timeout(self.timeout, async move {
            stream.write_all(bytes).await?;
            stream.flush().await
        })
        .await;

        match written {
            Ok(Ok(())) => {
                self.bytes_written += bytes.len();
                debug!("Wrote {} bytes to {}", bytes.len(), self.endpoint);
                Ok(bytes.len())
            }
            Ok(Err(err)) => Err(Error::transport(TransportAction::Write, &self.endpoint, err)),
            Err(_) => Err(Error::timed_out(TransportAction::Write, &self.endpoint)),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Bytes written on this connection so far.
    pub fn bytes_written(&self) -> usize {
        self.bytes_written
    }

    async fn close(mut self) -> Result<()> {
        match timeout(self.timeout, self.stream.shutdown()).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(Error::transport(TransportAction::Close, &self.endpoint, err)),
            Err(_) => Err(Error::timed_out(TransportAction::Close, &self.endpoint)),
        }
    }
}

/// Marks the manager connected while alive. Dropping it, including when a
/// send is cancelled mid-write, marks it disconnected again.
struct ConnectedGuard<'a>(&'a AtomicBool);

impl<'a> ConnectedGuard<'a> {
    fn new(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        ConnectedGuard(flag)
    }
}

impl Drop for ConnectedGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Something [`LinkManager::send_frame`] can put on the wire: a finished
/// frame, or color tokens that still need resolving.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameSource {
    Frame(Frame),
    Tokens(ColorTokens),
}

impl From<Frame> for FrameSource {
    fn from(frame: Frame) -> Self {
        FrameSource::Frame(frame)
    }
}

impl From<&Frame> for FrameSource {
    fn from(frame: &Frame) -> Self {
        FrameSource::Frame(frame.clone())
    }
}

impl From<ColorTokens> for FrameSource {
    fn from(tokens: ColorTokens) -> Self {
        FrameSource::Tokens(tokens)
    }
}

impl From<&str> for FrameSource {
    fn from(token: &str) -> Self {
        FrameSource::Tokens(token.into())
    }
}

impl From<String> for FrameSource {
    fn from(token: String) -> Self {
        FrameSource::Tokens(token.into())
    }
}

impl From<Vec<&str>> for FrameSource {
    fn from(tokens: Vec<&str>) -> Self {
        FrameSource::Tokens(tokens.into())
    }
}

impl From<Vec<String>> for FrameSource {
    fn from(tokens: Vec<String>) -> Self {
        FrameSource::Tokens(tokens.into())
    }
}

impl From<&[&str]> for FrameSource {
    fn from(tokens: &[&str]) -> Self {
        FrameSource::Tokens(tokens.into())
    }
}

impl<const N: usize> From<[&str; N]> for FrameSource {
    fn from(tokens: [&str; N]) -> Self {
        FrameSource::Tokens(tokens.into())
    }
}

/**
Streams frames to one light controller.

Connections are opened on demand and closed again at the end of every
operation. Operations on one manager are serialized, so concurrent callers
never open two sockets to the same controller or interleave their frames.
 */
pub struct LinkManager<C = TcpConnector> {
    config: LinkConfig,
    connector: C,
    resolver: ColorResolver,
    light_count: Option<usize>,
    lock: Mutex<()>,
    connected: AtomicBool,
}

impl LinkManager<TcpConnector> {
    pub fn new(config: LinkConfig) -> Self {
        Self::with_connector(config, TcpConnector)
    }
}

impl<C: Connector> LinkManager<C> {
    pub fn with_connector(config: LinkConfig, connector: C) -> Self {
        LinkManager {
            config,
            connector,
            resolver: ColorResolver::default(),
            light_count: None,
            lock: Mutex::new(()),
            connected: AtomicBool::new(false),
        }
    }

    /// Resolver used for frames built from color tokens.
    pub fn with_resolver(mut self, resolver: ColorResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Pads frames built from tokens with black up to `light_count` lights.
    pub fn with_light_count(mut self, light_count: usize) -> Self {
        self.light_count = Some(light_count);
        self
    }

    pub fn light_count(&self) -> Option<usize> {
        self.light_count
    }

    pub fn state(&self) -> LinkState {
        if self.connected.load(Ordering::SeqCst) {
            LinkState::Connected
        } else {
            LinkState::Disconnected
        }
    }

    /// Builds a frame with this manager's resolver. The manager's light count
    /// applies unless `options` sets one.
    pub fn build_frame(
        &self,
        tokens: impl Into<ColorTokens>,
        mut options: FrameOptions,
    ) -> Result<Frame> {
        if options.light_count.is_none() {
            options.light_count = self.light_count;
        }
        Frame::from_tokens(tokens, &self.resolver, options)
    }

    fn frame_from_source(&self, source: FrameSource) -> Result<Frame> {
        match source {
            FrameSource::Frame(frame) => Ok(frame),
            FrameSource::Tokens(tokens) => self.build_frame(tokens, FrameOptions::default()),
        }
    }

    /**
    Opens a connection, hands it to `op` and closes it again.

    The connection is released however this function exits, including when
    the returned future is dropped mid-write. Errors from `op` win over errors
    from closing.
     */
    pub async fn with_link<T, F>(&self, op: F) -> Result<T>
    where
        F: for<'a> FnOnce(&'a mut Link<C::Stream>) -> BoxFuture<'a, Result<T>>,
    {
        let _serialized = self.lock.lock().await;
        let endpoint = self.config.endpoint();

        debug!("Connecting to {}", endpoint);
        let stream = match timeout(self.config.timeout, self.connector.connect(&self.config)).await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(err)) => return Err(Error::transport(TransportAction::Connect, &endpoint, err)),
            Err(_) => return Err(Error::timed_out(TransportAction::Connect, &endpoint)),
        };
        let _connected = ConnectedGuard::new(&self.connected);

        let mut link = Link {
            stream,
            endpoint,
            timeout: self.config.timeout,
            bytes_written: 0,
        };
        let outcome = op(&mut link).await;

        let endpoint = link.endpoint.clone();
        let written = link.bytes_written;
        let closed = link.close().await;

        match (outcome, closed) {
            (Ok(value), Ok(())) => {
                debug!("Closed link to {} after {} bytes", endpoint, written);
                Ok(value)
            }
            (Ok(_), Err(err)) => Err(err),
            (Err(err), _) => {
                warn!("Dropped link to {} after {} bytes: {}", endpoint, written, err);
                Err(err)
            }
        }
    }

    /**
    Sends one frame on a fresh connection.

    Color tokens are resolved before connecting, so an unknown color never
    opens a socket.

    # Return
    Returns the number of bytes written.
     */
    pub async fn send_frame(&self, source: impl Into<FrameSource>) -> Result<usize> {
        let bytes = self.frame_from_source(source.into())?.to_bytes();
        self.with_link(move |link| Box::pin(async move { link.write_raw(&bytes).await }))
            .await
    }

    /**
    Sends every frame in order over a single connection.

    All frames are encoded before connecting. An empty sequence does not
    connect at all.

    # Return
    Returns the total number of bytes written.
     */
    pub async fn send_stream<I>(&self, frames: I) -> Result<usize>
    where
        I: IntoIterator,
        I::Item: Into<FrameSource>,
    {
        let payloads = frames
            .into_iter()
            .map(|source| self.frame_from_source(source.into()).map(|frame| frame.to_bytes()))
            .collect::<Result<Vec<Bytes>>>()?;
        if payloads.is_empty() {
            debug!("Empty stream for {}, not connecting", self.config.endpoint());
            return Ok(0);
        }

        debug!("Streaming {} frames to {}", payloads.len(), self.config.endpoint());
        self.with_link(move |link| {
            Box::pin(async move {
                let mut total = 0;
                for payload in &payloads {
                    total += link.write_raw(payload).await?;
                }
                Ok(total)
            })
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::led::color::{Brightness, RGB};

    #[test]
    fn test_new_manager_is_disconnected() {
        let manager = LinkManager::new(LinkConfig::default());
        assert_eq!(manager.state(), LinkState::Disconnected);
        assert_eq!(manager.light_count(), None);
    }

    #[test]
    fn test_build_frame_uses_manager_light_count() {
        let manager = LinkManager::new(LinkConfig::default())
            .with_resolver(ColorResolver::new(Brightness::FULL))
            .with_light_count(8);
        let frame = manager.build_frame("red", FrameOptions::default()).unwrap();
        assert_eq!(frame.light_count(), 8);
        assert_eq!(frame.lights()[0], RGB::new(255, 0, 0));

        let frame = manager
            .build_frame("red", FrameOptions::default().with_light_count(2))
            .unwrap();
        assert_eq!(frame.light_count(), 2);
    }

    #[test]
    fn test_frame_source_conversions() {
        assert_eq!(
            FrameSource::from("blue"),
            FrameSource::Tokens(ColorTokens::from(vec!["blue"]))
        );
        let frame = Frame::from_colors([RGB::BLACK], FrameOptions::default()).unwrap();
        assert_eq!(FrameSource::from(&frame), FrameSource::Frame(frame));
    }

    #[test]
    fn test_connected_guard_resets_on_drop() {
        let flag = AtomicBool::new(false);
        {
            let _guard = ConnectedGuard::new(&flag);
            assert!(flag.load(Ordering::SeqCst));
        }
        assert!(!flag.load(Ordering::SeqCst));
    }
}
