//! Trait abstraction for datagram I/O to enable testing

use async_trait::async_trait;
use std::io;
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tracing::{debug, info};

/// Trait for unreliable datagram transport to one fixed peer
#[async_trait]
pub trait DatagramIo: Send + Sync {
    /// Send one datagram to the peer
    async fn send(&self, data: &[u8]) -> io::Result<usize>;

    /// Wait for the next inbound datagram; returns its length
    async fn recv(&self, buf: &mut [u8]) -> io::Result<usize>;
}

/// UDP socket bound locally, sending to one remote vehicle address
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
    remote: SocketAddr,
}

impl UdpTransport {
    /// Bind the local socket
    ///
    /// # Arguments
    ///
    /// * `local` - Local bind address (port 0 picks a free port)
    /// * `remote` - Vehicle address every send goes to
    ///
    /// # Errors
    ///
    /// Returns the bind error (address in use, permission denied)
    pub async fn bind(local: SocketAddr, remote: SocketAddr) -> io::Result<Self> {
        let socket = UdpSocket::bind(local).await?;
        info!(
            "UDP socket bound at {}, vehicle at {}",
            socket.local_addr()?,
            remote
        );
        Ok(Self { socket, remote })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.remote
    }
}

#[async_trait]
impl DatagramIo for UdpTransport {
    async fn send(&self, data: &[u8]) -> io::Result<usize> {
        self.socket.send_to(data, self.remote).await
    }

    async fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        let (len, from) = self.socket.recv_from(buf).await?;
        if from != self.remote {
            debug!("Datagram from unexpected peer {} ({} bytes)", from, len);
        }
        Ok(len)
    }
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use tokio::sync::Notify;

    /// Mock datagram transport for testing
    ///
    /// Sent datagrams are recorded; inbound datagrams are queued with
    /// [`push_inbound`](Self::push_inbound). `recv` waits until one is queued.
    #[derive(Clone)]
    pub struct MockDatagramIo {
        pub sent: Arc<Mutex<Vec<Vec<u8>>>>,
        pub inbound: Arc<Mutex<VecDeque<Vec<u8>>>>,
        pub send_error: Arc<Mutex<Option<io::ErrorKind>>>,
        pub recv_error: Arc<Mutex<Option<io::ErrorKind>>>,
        arrived: Arc<Notify>,
    }

    impl MockDatagramIo {
        pub fn new() -> Self {
            Self {
                sent: Arc::new(Mutex::new(Vec::new())),
                inbound: Arc::new(Mutex::new(VecDeque::new())),
                send_error: Arc::new(Mutex::new(None)),
                recv_error: Arc::new(Mutex::new(None)),
                arrived: Arc::new(Notify::new()),
            }
        }

        pub fn get_sent(&self) -> Vec<Vec<u8>> {
            self.sent.lock().unwrap().clone()
        }

        pub fn push_inbound(&self, datagram: &[u8]) {
            self.inbound.lock().unwrap().push_back(datagram.to_vec());
            self.arrived.notify_one();
        }

        pub fn set_send_error(&self, error: io::ErrorKind) {
            *self.send_error.lock().unwrap() = Some(error);
        }

        pub fn set_recv_error(&self, error: io::ErrorKind) {
            *self.recv_error.lock().unwrap() = Some(error);
        }
    }

    #[async_trait]
    impl DatagramIo for MockDatagramIo {
        async fn send(&self, data: &[u8]) -> io::Result<usize> {
            if let Some(error) = *self.send_error.lock().unwrap() {
                return Err(io::Error::new(error, "Mock send error"));
            }
            self.sent.lock().unwrap().push(data.to_vec());
            Ok(data.len())
        }

        async fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
            loop {
                if let Some(error) = *self.recv_error.lock().unwrap() {
                    return Err(io::Error::new(error, "Mock recv error"));
                }
                let next = self.inbound.lock().unwrap().pop_front();
                if let Some(datagram) = next {
                    let len = datagram.len().min(buf.len());
                    buf[..len].copy_from_slice(&datagram[..len]);
                    return Ok(len);
                }
                self.arrived.notified().await;
            }
        }
    }
}
