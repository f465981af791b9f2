use std::path::Path;
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::mpsc;
use tokio_util::codec::Framed;
use tracing::{debug, error, info, instrument, warn};

use crate::core::codec::{Frame, FrameCodec};
use crate::error::Result;
use crate::protocol::message::{cc_only, Command, CompletionCode};
use crate::protocol::Dispatcher;

/// Start the responder on a Unix domain socket.
///
/// Installs a ctrl-c handler that drives a graceful shutdown.
#[instrument(skip(path, dispatcher), fields(socket_path = %path.as_ref().display()))]
pub async fn start_server<P: AsRef<Path>>(path: P, dispatcher: Arc<Dispatcher>) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);

    tokio::spawn(async move {
        if let Ok(()) = tokio::signal::ctrl_c().await {
            info!("Received CTRL+C signal, shutting down");
            let _ = shutdown_tx.send(()).await;
        }
    });

    start_server_with_shutdown(path, dispatcher, shutdown_rx).await
}

/// Start the responder with an external shutdown channel.
#[instrument(skip(path, dispatcher, shutdown_rx), fields(socket_path = %path.as_ref().display()))]
pub async fn start_server_with_shutdown<P: AsRef<Path>>(
    path: P,
    dispatcher: Arc<Dispatcher>,
    mut shutdown_rx: mpsc::Receiver<()>,
) -> Result<()> {
    if path.as_ref().exists() {
        tokio::fs::remove_file(&path).await.ok();
    }

    let path_string = path.as_ref().to_string_lossy().to_string();

    let listener = UnixListener::bind(&path)?;
    info!(path = %path_string, "Listening on unix socket");

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                info!("Shutting down responder");
                if Path::new(&path_string).exists() {
                    if let Err(e) = tokio::fs::remove_file(&path_string).await {
                        error!(error = %e, path = %path_string, "Failed to remove socket file");
                    }
                }
                return Ok(());
            }

            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, _)) => {
                        let dispatcher = Arc::clone(&dispatcher);
                        tokio::spawn(async move {
                            serve_connection(stream, dispatcher).await;
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "Error accepting connection");
                    }
                }
            }
        }
    }
}

/// Serve one connection: decode frames, dispatch commands in order, answer
/// each before reading the next.
async fn serve_connection(stream: UnixStream, dispatcher: Arc<Dispatcher>) {
    let mut framed = Framed::new(stream, FrameCodec);

    while let Some(next) = framed.next().await {
        let frame = match next {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "Dropping connection on framing error");
                return;
            }
        };
        debug!(bytes = frame.payload.len(), "Received command frame");

        let response = match frame.payload.split_first() {
            Some((opcode, body)) => {
                let command = Command {
                    opcode: *opcode,
                    payload: body.to_vec(),
                };
                match dispatcher.dispatch(&command) {
                    Ok(response) => response,
                    Err(e) => {
                        error!(error = %e, "Dispatch failed");
                        cc_only(CompletionCode::Error)
                    }
                }
            }
            // A frame with no opcode byte cannot be routed.
            None => cc_only(CompletionCode::InvalidLength),
        };

        if let Err(e) = framed.send(Frame { payload: response }).await {
            warn!(error = %e, "Failed to write response, closing connection");
            return;
        }
    }
}

/// Connect to a responder socket, returning the framed client side.
#[instrument(skip(path), fields(socket_path = %path.as_ref().display()))]
pub async fn connect<P: AsRef<Path>>(path: P) -> Result<Framed<UnixStream, FrameCodec>> {
    let stream = UnixStream::connect(path).await?;
    Ok(Framed::new(stream, FrameCodec))
}
