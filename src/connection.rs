use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use uuid::Uuid;

use crate::codec::{FrameCodec, Request};
use crate::frame::Frame;
use crate::Result;

/// A client connection. Requests are decoded and replies encoded by [`FrameCodec`] on top of
/// the socket.
pub struct Connection {
    pub id: Uuid,
    framed: Framed<TcpStream, FrameCodec>,
}

impl Connection {
    pub fn new(stream: TcpStream) -> Connection {
        Connection {
            id: Uuid::new_v4(),
            framed: Framed::new(stream, FrameCodec::new()),
        }
    }

    /// Reads the next request. Returns `None` once the client closed the connection. A malformed
    /// request is returned as `Some(Err(_))`, it doesn't end the connection; transport failures
    /// do.
    pub async fn read_frame(&mut self) -> Result<Option<Request>> {
        self.framed.next().await.transpose()
    }

    /// Writes the frame and flushes it to the socket.
    pub async fn write_frame(&mut self, frame: Frame) -> Result<()> {
        self.framed.send(frame).await
    }
}
