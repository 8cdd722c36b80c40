//! Frame server.
//!
//! Accepts one client at a time. After the handshake the client receives a
//! raw camera frame followed by its prediction line, every
//! `frame_interval_secs`, until either side drops the connection. The server
//! then goes back to accepting.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::error::FrameError;
use crate::models::{AppConfig, ClassLabel, Credentials};
use crate::protocol::{self, AuthError, TOTAL_FRAME_SIZE};
use crate::services::{
    open_source, Classifier, FramePipeline, FrameSource, LinearClassifier, ModelArtifact,
};
use bmp_reduce::{BmpRef, Geometry};

const LINE_END: &[u8] = b"\r\n";

pub struct FrameServer {
    credentials: Credentials,
    frame_interval: Duration,
    auth_read_limit: usize,
    auth_timeout: Duration,
    source: Box<dyn FrameSource>,
    pipeline: FramePipeline,
}

/// Load the model and open the frame source named in `config`.
pub fn create_server(config: &AppConfig) -> anyhow::Result<FrameServer> {
    let artifact = ModelArtifact::load(&config.model.path)?;
    let classifier = LinearClassifier::from_artifact(&artifact, ClassLabel::COUNT)?;
    let source = open_source(&config.camera)?;
    FrameServer::new(config, source, Box::new(classifier))
}

impl FrameServer {
    pub fn new(
        config: &AppConfig,
        source: Box<dyn FrameSource>,
        classifier: Box<dyn Classifier>,
    ) -> anyhow::Result<Self> {
        let transform = config.pipeline.transform.to_transform()?;
        tracing::info!(%transform, "Frame pipeline ready");
        Ok(Self {
            credentials: config.credentials.clone(),
            frame_interval: Duration::from_secs(config.server.frame_interval_secs),
            auth_read_limit: config.server.auth_read_limit,
            auth_timeout: Duration::from_secs(config.server.auth_timeout_secs),
            source,
            pipeline: FramePipeline::new(transform, classifier, config.model.recognition_threshold),
        })
    }

    /// Serve clients one after another until the listener fails.
    pub async fn serve(mut self, listener: TcpListener) -> std::io::Result<()> {
        loop {
            let (mut stream, peer) = listener.accept().await?;
            tracing::info!(%peer, "Client connected");

            let auth = authenticate(
                &mut stream,
                &self.credentials,
                self.auth_read_limit,
                self.auth_timeout,
            );
            if let Err(e) = auth.await {
                tracing::warn!(%peer, %e, "Rejected client");
                continue;
            }
            tracing::info!(%peer, "Client authenticated");

            if let Err(e) = self.stream_frames(&mut stream, peer).await {
                tracing::info!(%peer, %e, "Client session ended");
            }
        }
    }

    async fn stream_frames(
        &mut self,
        stream: &mut TcpStream,
        peer: SocketAddr,
    ) -> Result<(), FrameError> {
        loop {
            match self.next_frame() {
                Ok((frame, label)) => {
                    stream.write_all(&frame).await?;
                    stream
                        .write_all(protocol::format_prediction(label).as_bytes())
                        .await?;
                    tracing::info!(%peer, class = %label, bytes = frame.len(), "Sent frame");
                }
                Err(e @ (FrameError::TransientCaptureFailure | FrameError::Bmp(_))) => {
                    tracing::warn!(%e, "Skipping frame");
                }
                Err(e) => return Err(e),
            }
            tokio::time::sleep(self.frame_interval).await;
        }
    }

    /// Capture, validate and classify one frame. Nothing is sent for frames
    /// that fail here, so the client never sees a partial record.
    fn next_frame(&mut self) -> Result<(Vec<u8>, ClassLabel), FrameError> {
        let frame = self
            .source
            .capture()
            .ok_or(FrameError::TransientCaptureFailure)?;
        if frame.len() != TOTAL_FRAME_SIZE {
            return Err(bmp_reduce::BmpError::InvalidDimensions {
                expected: TOTAL_FRAME_SIZE,
                actual: frame.len(),
            }
            .into());
        }
        BmpRef::parse(&frame, Geometry::SOURCE)?;
        let prediction = self.pipeline.process(&frame)?;
        Ok((frame, prediction.label))
    }
}

async fn authenticate(
    stream: &mut TcpStream,
    credentials: &Credentials,
    limit: usize,
    timeout: Duration,
) -> Result<(), AuthError> {
    let request = tokio::time::timeout(timeout, read_auth_request(stream, limit))
        .await
        .map_err(|_| AuthError::Timeout)??;
    protocol::verify(&request, credentials)
}

/// Read the handshake up to the end of the request line, `limit` bytes, or
/// EOF. Only the request line carries credentials, so the server never waits
/// on headers.
async fn read_auth_request(stream: &mut TcpStream, limit: usize) -> std::io::Result<Vec<u8>> {
    let mut request = Vec::with_capacity(limit);
    let mut chunk = [0u8; 64];
    while request.len() < limit {
        let want = chunk.len().min(limit - request.len());
        let n = stream.read(&mut chunk[..want]).await?;
        if n == 0 {
            break;
        }
        let scan_from = request.len().saturating_sub(LINE_END.len() - 1);
        request.extend_from_slice(&chunk[..n]);
        if request[scan_from..]
            .windows(LINE_END.len())
            .any(|w| w == LINE_END)
        {
            break;
        }
    }
    Ok(request)
}
