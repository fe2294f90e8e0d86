use std::collections::VecDeque;
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::EnvFilter;

use crate::codec::Request;
use crate::commands::Command;
use crate::connection::Connection;
use crate::frame::Frame;
use crate::store::Store;
use crate::Error;

pub const DEFAULT_PORT: u16 = 6379;
pub const DEFAULT_BIND: &str = "127.0.0.1";

/// Requests read ahead while a blocking command runs. Past this the socket is left alone until
/// the command completes.
const MAX_PENDING_REQUESTS: usize = 64;

#[derive(Clone, Debug)]
pub struct Config {
    pub bind: String,
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind: DEFAULT_BIND.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

pub async fn run(config: Config) -> Result<(), Error> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| debug!("Failed to initialize global tracing: {}", e));

    let listener = TcpListener::bind((config.bind.as_str(), config.port)).await?;

    serve(listener, Store::new()).await
}

/// Accepts connections on an already bound listener, serving each one on its own task until
/// accepting fails.
pub async fn serve(listener: TcpListener, store: Store) -> Result<(), Error> {
    info!("Server listening on {}", listener.local_addr()?);

    loop {
        let (socket, client_address) = listener.accept().await?;
        let store = store.clone();
        info!("Accepted connection from {:?}", client_address);

        tokio::spawn(async move {
            if let Err(e) = handle_connection(socket, client_address, store).await {
                error!("Connection failed: {}", e);
            }
        });
    }
}

/// Serves a single client: reads requests, runs them and writes back the replies, one at a
/// time, until the client disconnects. Invalid requests are answered with an error reply.
#[instrument(
    name = "connection",
    skip(stream, store),
    fields(connection_id, client_address)
)]
pub async fn handle_connection(
    stream: TcpStream,
    client_address: SocketAddr,
    store: Store,
) -> Result<(), Error> {
    let mut conn = Connection::new(stream);

    tracing::Span::current()
        .record("connection_id", conn.id.to_string())
        .record("client_address", client_address.to_string());

    // Requests the client pipelined while a blocking command was running.
    let mut pending = VecDeque::new();

    loop {
        let request = match pending.pop_front() {
            Some(request) => request,
            None => match conn.read_frame().await? {
                Some(request) => request,
                None => break,
            },
        };

        let frame = match request {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Protocol error: {}", e);
                conn.write_frame(Frame::Error(e.to_string())).await?;
                continue;
            }
        };

        debug!("Received frame from client: {:?}", frame);
        let res = match Command::try_from(frame) {
            Ok(cmd) => match exec(cmd, &store, &mut conn, &mut pending).await? {
                Some(res) => res,
                None => break,
            },
            Err(e) => Err(e),
        };
        let res = res.unwrap_or_else(|e| {
            warn!("Command failed: {}", e);
            Frame::Error(e.to_string())
        });
        debug!("Sending response to client: {:?}", res);

        conn.write_frame(res).await?;
    }

    info!("Connection closed");
    Ok(())
}

/// Runs the command while watching the connection, so that a client that goes away while
/// blocked stops waiting. Requests that arrive in the meantime are queued in `pending`, up to
/// [`MAX_PENDING_REQUESTS`]. Returns `None` when the client disconnected before the command
/// completed.
async fn exec(
    cmd: Command,
    store: &Store,
    conn: &mut Connection,
    pending: &mut VecDeque<Request>,
) -> Result<Option<Result<Frame, Error>>, Error> {
    let exec = cmd.exec(store.clone());
    tokio::pin!(exec);

    loop {
        tokio::select! {
            biased;

            res = &mut exec => return Ok(Some(res)),
            request = conn.read_frame(), if pending.len() < MAX_PENDING_REQUESTS => match request? {
                Some(request) => pending.push_back(request),
                None => {
                    debug!("Client disconnected while running a command");
                    return Ok(None);
                }
            },
        }
    }
}
