//! Client side of the frame protocol.

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpStream, ToSocketAddrs};

use crate::models::{ClassLabel, Credentials};
use crate::protocol::{self, PredictionLineError, TOTAL_FRAME_SIZE};
use bmp_reduce::{BmpError, BmpRef, Geometry};

/// Longest prediction line accepted, newline included.
pub const MAX_PREDICTION_LINE: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Transport error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Connection closed after {received} of {total} frame bytes", total = TOTAL_FRAME_SIZE)]
    IncompleteFrame { received: usize },

    #[error("Connection closed before the prediction line")]
    MissingPrediction,

    #[error("Prediction line longer than {limit} bytes", limit = MAX_PREDICTION_LINE)]
    PredictionLineTooLong,

    #[error("Bad prediction line: {0}")]
    Prediction(#[from] PredictionLineError),
}

/// One frame record as sent by the server.
#[derive(Debug, Clone)]
pub struct ReceivedFrame {
    pub bmp: Vec<u8>,
    pub label: ClassLabel,
}

impl ReceivedFrame {
    pub fn view(&self) -> Result<BmpRef<'_>, BmpError> {
        BmpRef::parse(&self.bmp, Geometry::SOURCE)
    }
}

pub struct StreamClient {
    reader: BufReader<TcpStream>,
}

impl StreamClient {
    /// Connect and send the handshake.
    ///
    /// Rejection is only visible as the server closing the connection, which
    /// the first [`next_frame`](Self::next_frame) reports as `Ok(None)`.
    pub async fn connect(
        addr: impl ToSocketAddrs,
        credentials: &Credentials,
    ) -> Result<Self, ClientError> {
        let mut stream = TcpStream::connect(addr).await?;
        let host = stream.peer_addr()?.ip().to_string();
        stream
            .write_all(protocol::build_auth_request(credentials, &host).as_bytes())
            .await?;
        tracing::debug!(%host, "Sent handshake");
        Ok(Self {
            reader: BufReader::new(stream),
        })
    }

    /// Read the next frame and its prediction.
    ///
    /// Returns `Ok(None)` if the server closed the connection between frames.
    pub async fn next_frame(&mut self) -> Result<Option<ReceivedFrame>, ClientError> {
        let mut bmp = vec![0u8; TOTAL_FRAME_SIZE];
        let mut received = 0;
        while received < TOTAL_FRAME_SIZE {
            let n = match self.reader.read(&mut bmp[received..]).await {
                Ok(n) => n,
                // A rejected handshake may surface as a reset instead of EOF.
                Err(e) if received == 0 && e.kind() == std::io::ErrorKind::ConnectionReset => 0,
                Err(e) => return Err(e.into()),
            };
            if n == 0 {
                return if received == 0 {
                    Ok(None)
                } else {
                    Err(ClientError::IncompleteFrame { received })
                };
            }
            received += n;
        }

        let mut line = String::new();
        let n = (&mut self.reader)
            .take(MAX_PREDICTION_LINE as u64)
            .read_line(&mut line)
            .await?;
        if !line.ends_with('\n') {
            return Err(if n == MAX_PREDICTION_LINE {
                ClientError::PredictionLineTooLong
            } else {
                ClientError::MissingPrediction
            });
        }
        let label = protocol::parse_prediction_line(&line)?;
        tracing::debug!(class = %label, "Received frame");
        Ok(Some(ReceivedFrame { bmp, label }))
    }
}
