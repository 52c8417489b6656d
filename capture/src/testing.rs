//! Local stand-in cameras for exercising the HTTP sources.

use std::time::Duration;

use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};
use pulsecam_common::{Frame, FrameError, FrameHandle};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// A 16x16 solid-colour JPEG.
pub(crate) fn jpeg(rgb: [u8; 3]) -> Vec<u8> {
    let img = RgbImage::from_pixel(16, 16, Rgb(rgb));
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, 95)
        .encode_image(&img)
        .unwrap();
    out
}

pub(crate) async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, format!("http://{addr}"))
}

/// Consume one request head.
pub(crate) async fn read_request(stream: &mut TcpStream) {
    let mut head = Vec::new();
    let mut chunk = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => head.extend_from_slice(&chunk[..n]),
        }
    }
}

/// Single-frame camera: connection `n` is answered with `reply(n)`. The
/// listener shuts once `reply` returns `None`, so later requests are refused.
pub(crate) async fn serve_frames<F>(reply: F) -> String
where
    F: Fn(usize) -> Option<(u16, Vec<u8>)> + Send + 'static,
{
    let (listener, base) = bind().await;
    tokio::spawn(async move {
        for n in 0.. {
            let Some((status, body)) = reply(n) else {
                break;
            };
            let Ok((mut stream, _)) = listener.accept().await else {
                break;
            };
            read_request(&mut stream).await;
            let head = format!(
                "HTTP/1.1 {status} Camera\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            let _ = stream.write_all(head.as_bytes()).await;
            let _ = stream.write_all(&body).await;
            let _ = stream.shutdown().await;
        }
    });
    format!("{base}/frame")
}

/// Next frame or error from `handle`, waiting up to five seconds.
pub(crate) async fn next_result<H: FrameHandle>(handle: &mut H) -> Result<Frame, FrameError> {
    let poll = async {
        loop {
            match handle.next_frame() {
                Ok(Some(frame)) => return Ok(frame),
                Ok(None) => tokio::time::sleep(Duration::from_millis(5)).await,
                Err(e) => return Err(e),
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(5), poll)
        .await
        .expect("camera produced nothing within 5s")
}

/// MJPEG camera answering a single connection with `status` and `body`.
/// With `declared_len` set, the response claims that many body bytes and
/// hangs up early when `body` is shorter.
pub(crate) async fn serve_stream(status: u16, body: Vec<u8>, declared_len: Option<usize>) -> String {
    let (listener, base) = bind().await;
    tokio::spawn(async move {
        let Ok((mut stream, _)) = listener.accept().await else {
            return;
        };
        read_request(&mut stream).await;
        let mut head = format!(
            "HTTP/1.1 {status} Camera\r\nContent-Type: multipart/x-mixed-replace; boundary=frame\r\nConnection: close\r\n"
        );
        if let Some(len) = declared_len {
            head.push_str(&format!("Content-Length: {len}\r\n"));
        }
        head.push_str("\r\n");
        let _ = stream.write_all(head.as_bytes()).await;
        let _ = stream.write_all(&body).await;
        let _ = stream.shutdown().await;
    });
    format!("{base}/stream")
}
