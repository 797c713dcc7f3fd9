use bytes::BytesMut;
use memchr::memchr;
use serde::de::DeserializeOwned;
use tokio::io::AsyncRead;
use tokio::io::AsyncReadExt;

const DEFAULT_MAX_FRAME: usize = 64 * 1024;

/// Reads newline-delimited JSON frames from a byte stream.
///
/// Blank lines are skipped so peers may keep-alive with bare newlines.
#[derive(Debug)]
pub struct JsonReader<R> {
    inner: R,
    buf: BytesMut,
    max_frame: usize,
}

impl<R> JsonReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(4 * 1024),
            max_frame: DEFAULT_MAX_FRAME,
        }
    }

    pub fn max_frame(mut self, max: usize) -> Self {
        self.max_frame = max.max(1);
        self
    }
}

impl<R: AsyncRead + Unpin> JsonReader<R> {
    /// Read one frame.
    ///
    /// Returns:
    /// - `Ok(Some(t))` for a decoded frame,
    /// - `Ok(None)` on clean EOF with no buffered data,
    /// - `InvalidData` for an oversized or non-JSON line.
    pub async fn read_frame<T: DeserializeOwned>(&mut self) -> std::io::Result<Option<T>> {
        loop {
            if let Some(i) = memchr(b'\n', &self.buf) {
                let raw = self.buf.split_to(i + 1);
                let body = strip_line(&raw);
                if body.is_empty() {
                    continue;
                }
                let t = serde_json::from_slice(body).map_err(|e| {
                    std::io::Error::new(std::io::ErrorKind::InvalidData, e)
                })?;
                return Ok(Some(t));
            }

            if self.buf.len() > self.max_frame {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "frame too long",
                ));
            }

            let n = self.inner.read_buf(&mut self.buf).await?;
            if n == 0 {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                return Err(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "eof inside frame",
                ));
            }
        }
    }
}

fn strip_line(raw: &[u8]) -> &[u8] {
    let mut end = raw.len();
    while end > 0 && (raw[end - 1] == b'\n' || raw[end - 1] == b'\r') {
        end -= 1;
    }
    &raw[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn reads_frames_and_skips_blank_lines() {
        let (a, mut b) = tokio::io::duplex(256);
        tokio::spawn(async move {
            b.write_all(b"{\"x\":1}\r\n\n{\"x\":2}\n").await.unwrap();
        });

        let mut r = JsonReader::new(a);
        let f1: Value = r.read_frame().await.unwrap().unwrap();
        let f2: Value = r.read_frame().await.unwrap().unwrap();
        assert_eq!(f1["x"], 1);
        assert_eq!(f2["x"], 2);
        assert!(r.read_frame::<Value>().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rejects_oversized_frames() {
        let (a, mut b) = tokio::io::duplex(256);
        tokio::spawn(async move {
            let _ = b.write_all(&[b'x'; 64]).await;
        });

        let mut r = JsonReader::new(a).max_frame(16);
        let err = r.read_frame::<Value>().await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }

    #[tokio::test]
    async fn rejects_non_json_lines() {
        let (a, mut b) = tokio::io::duplex(256);
        tokio::spawn(async move {
            let _ = b.write_all(b"not json\n").await;
        });

        let mut r = JsonReader::new(a);
        let err = r.read_frame::<Value>().await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }
}
