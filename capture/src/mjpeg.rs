use bytes::BytesMut;
use futures_util::StreamExt;
use pulsecam_common::config::CameraConfig;
use pulsecam_common::{AcquisitionError, FrameError, FrameSource};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::channel::{offer, ChannelHandle, FrameResult, FRAME_QUEUE_DEPTH};
use crate::decode::decode_jpeg;
use crate::{acquisition_error_for_status, http_client};

const BOUNDARY: &[u8] = b"--frame\r\n";
const HEADER_END: &[u8] = b"\r\n\r\n";

/// Parse state for the MJPEG multipart stream.
enum ParseState {
    /// Looking for the boundary marker `--frame\r\n`.
    SeekingBoundary,
    /// Found boundary, now looking for end of headers `\r\n\r\n`.
    SeekingHeaderEnd,
    /// Collecting JPEG bytes until the next boundary.
    CollectingJpeg,
}

/// Incremental splitter for `multipart/x-mixed-replace` bodies.
///
/// Chunks are fed as they arrive from the network; complete JPEG payloads
/// come out. Boundaries and headers may straddle chunk edges.
pub struct MjpegParser {
    buffer: BytesMut,
    state: ParseState,
    jpeg_start: usize,
}

impl Default for MjpegParser {
    fn default() -> Self {
        Self::new()
    }
}

impl MjpegParser {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(256 * 1024),
            state: ParseState::SeekingBoundary,
            jpeg_start: 0,
        }
    }

    /// Feed one network chunk, returning every JPEG it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        self.buffer.extend_from_slice(chunk);
        let mut jpegs = Vec::new();

        loop {
            match self.state {
                ParseState::SeekingBoundary => {
                    if let Some(pos) = find_subsequence(&self.buffer, BOUNDARY) {
                        let _ = self.buffer.split_to(pos + BOUNDARY.len());
                        self.state = ParseState::SeekingHeaderEnd;
                    } else {
                        // Keep the tail in case the boundary spans chunks
                        if self.buffer.len() > BOUNDARY.len() {
                            let _ = self.buffer.split_to(self.buffer.len() - BOUNDARY.len());
                        }
                        break;
                    }
                }
                ParseState::SeekingHeaderEnd => {
                    if let Some(pos) = find_subsequence(&self.buffer, HEADER_END) {
                        let _ = self.buffer.split_to(pos + HEADER_END.len());
                        self.jpeg_start = 0;
                        self.state = ParseState::CollectingJpeg;
                    } else {
                        break;
                    }
                }
                ParseState::CollectingJpeg => {
                    let search_from = self.jpeg_start.min(self.buffer.len());
                    if let Some(pos) = find_subsequence(&self.buffer[search_from..], BOUNDARY) {
                        let jpeg_end = search_from + pos;
                        // Strip trailing \r\n before boundary
                        let end = if jpeg_end >= 2
                            && self.buffer[jpeg_end - 2] == b'\r'
                            && self.buffer[jpeg_end - 1] == b'\n'
                        {
                            jpeg_end - 2
                        } else {
                            jpeg_end
                        };

                        let jpeg_data = self.buffer[..end].to_vec();
                        let _ = self.buffer.split_to(jpeg_end + BOUNDARY.len());
                        if !jpeg_data.is_empty() {
                            jpegs.push(jpeg_data);
                        }
                        self.state = ParseState::SeekingHeaderEnd;
                    } else {
                        // Avoid re-scanning data already known to be boundary-free
                        self.jpeg_start = self.buffer.len().saturating_sub(BOUNDARY.len());
                        break;
                    }
                }
            }
        }

        jpegs
    }
}

/// Live MJPEG-over-HTTP camera stream.
pub struct MjpegSource {
    url: String,
    connect_timeout: Duration,
}

impl MjpegSource {
    pub fn new(url: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            url: url.into(),
            connect_timeout,
        }
    }

    pub fn from_config(config: &CameraConfig) -> Self {
        let url = format!(
            "{}?quality={}&fps={}&width={}&height={}",
            config.url, config.quality, config.fps, config.width, config.height
        );
        Self::new(url, Duration::from_secs(config.connect_timeout_secs))
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl FrameSource for MjpegSource {
    type Handle = ChannelHandle;

    async fn open(&self) -> Result<ChannelHandle, AcquisitionError> {
        info!(url = self.url, "connecting to MJPEG stream");
        let client = http_client(self.connect_timeout)?;
        let response = client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| AcquisitionError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(acquisition_error_for_status(response.status().as_u16()));
        }
        info!(status = %response.status(), "connected to MJPEG stream");

        let (tx, rx) = mpsc::channel(FRAME_QUEUE_DEPTH);
        let task = tokio::spawn(async move {
            consume_stream(response, tx).await;
        });
        Ok(ChannelHandle::new(rx, task))
    }

    fn name(&self) -> &str {
        "mjpeg"
    }
}

async fn consume_stream(response: reqwest::Response, tx: mpsc::Sender<FrameResult>) {
    let mut byte_stream = response.bytes_stream();
    let mut parser = MjpegParser::new();
    let mut frames: u64 = 0;

    while let Some(chunk) = byte_stream.next().await {
        let chunk = match chunk {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "MJPEG stream error");
                offer(&tx, Err(FrameError::Transport(e.to_string())));
                return;
            }
        };

        for jpeg in parser.push(&chunk) {
            frames += 1;
            let decoded = decode_jpeg(&jpeg);
            let failed = decoded.is_err();
            if failed {
                warn!(frames, bytes = jpeg.len(), "undecodable JPEG in MJPEG stream");
            }
            if !offer(&tx, decoded) || failed {
                return;
            }
            if frames % 300 == 0 {
                debug!(frames, "MJPEG frames received");
            }
        }
    }

    // Dropping the sender tells the handle the stream ended.
    info!(frames, "MJPEG stream ended");
}

/// Find the position of `needle` in `haystack`.
fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
