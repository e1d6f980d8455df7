//! The serve loop.

use crate::{
    dispatch::Dispatcher,
    error::ServeError,
    transport::{DEFAULT_MAX_LINE_LENGTH, LineCodec},
};
use futures::{SinkExt, StreamExt, future};
use std::pin::pin;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, info, warn};

/// Reads requests line by line and writes one response line per answered
/// request.
///
/// Up to `max_in_flight` requests are handled concurrently. Responses are
/// still written in request order, each as a single write, so lines never
/// interleave.
pub struct Server {
    dispatcher: Dispatcher,
    max_in_flight: usize,
    max_line_length: usize,
}

impl Server {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            max_in_flight: 1,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }

    /// Clamped to at least one.
    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight.max(1);
        self
    }

    pub fn with_max_line_length(mut self, max_line_length: usize) -> Self {
        self.max_line_length = max_line_length;
        self
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Serve until `reader` reaches end of input or `shutdown` resolves.
    ///
    /// After shutdown no new lines are read; requests already in flight run
    /// to completion and their responses are written. Returns an error only
    /// when a response cannot be written.
    pub async fn serve<R, W, S>(&self, reader: R, writer: W, shutdown: S) -> Result<(), ServeError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
        S: Future<Output = ()>,
    {
        let lines = FramedRead::new(reader, LineCodec::with_max_length(self.max_line_length));
        let mut sink = FramedWrite::new(writer, LineCodec::with_max_length(self.max_line_length));

        info!(max_in_flight = self.max_in_flight, "server ready");

        let responses = lines
            .take_until(shutdown)
            .filter_map(|line| {
                future::ready(match line {
                    Ok(line) => Some(line),
                    Err(err) => {
                        warn!(error = %err, "failed to read input; stopping");
                        None
                    }
                })
            })
            .map(|line| async move { self.dispatcher.handle_line(&line).await })
            .buffered(self.max_in_flight);
        let mut responses = pin!(responses);

        let mut written = 0u64;
        while let Some(response) = responses.next().await {
            let Some(response) = response else {
                continue;
            };
            sink.send(response).await.map_err(ServeError::Transport)?;
            written += 1;
        }

        debug!(written, "response stream drained");
        info!("server stopped");
        Ok(())
    }
}

/// Resolves on Ctrl-C.
pub async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("interrupt received; shutting down"),
        Err(err) => {
            warn!(error = %err, "cannot listen for interrupt");
            future::pending::<()>().await;
        }
    }
}
