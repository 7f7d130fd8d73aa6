//! Line-delimited JSON transport and the serve loop.
//!
//! Each JSON-RPC message is a single line terminated by `\n`. Requests are
//! processed one at a time: a line is fully handled, and its response
//! written, before the next line is read.

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use crate::server::Server;
use crate::types::McpResponse;

/// Failures that end the serve loop.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("error reading input: {0}")]
    Read(#[source] std::io::Error),
    #[error("error writing output: {0}")]
    Write(#[source] std::io::Error),
    #[error("error encoding response: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Reads newline-delimited messages and writes newline-terminated responses.
///
/// Generic over reader and writer so tests can drive it from memory.
pub struct LineTransport<R, W> {
    reader: BufReader<R>,
    writer: W,
}

impl<R, W> LineTransport<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: BufReader::new(reader),
            writer,
        }
    }

    /// Reads the next line, without its terminator.
    ///
    /// Returns `None` at end of input. Raw bytes are returned so that invalid
    /// UTF-8 surfaces as a parse error rather than a read failure.
    pub async fn read_line(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        let mut line = Vec::new();
        let n = self
            .reader
            .read_until(b'\n', &mut line)
            .await
            .map_err(TransportError::Read)?;

        if n == 0 {
            return Ok(None);
        }

        while matches!(line.last(), Some(b'\n' | b'\r')) {
            line.pop();
        }

        tracing::trace!(len = line.len(), "read message");
        Ok(Some(line))
    }

    /// Writes one message followed by `\n` and flushes.
    pub async fn write_line(&mut self, message: &[u8]) -> Result<(), TransportError> {
        tracing::trace!(len = message.len(), "writing message");

        self.writer
            .write_all(message)
            .await
            .map_err(TransportError::Write)?;
        self.writer
            .write_all(b"\n")
            .await
            .map_err(TransportError::Write)?;
        self.writer.flush().await.map_err(TransportError::Write)?;

        Ok(())
    }

    /// Serializes a response onto one line. Notifications write nothing.
    pub async fn write_response(&mut self, resp: &McpResponse) -> Result<(), TransportError> {
        if resp.is_notification() {
            return Ok(());
        }
        let bytes = serde_json::to_vec(resp)?;
        self.write_line(&bytes).await
    }

    pub fn into_inner(self) -> (R, W) {
        (self.reader.into_inner(), self.writer)
    }
}

impl Server {
    /// Serve requests from `reader`, writing responses to `writer`, until
    /// end of input.
    ///
    /// Malformed lines are answered with an error and do not stop the loop.
    /// Any read or write failure does.
    pub async fn serve<R, W>(&self, reader: R, writer: W) -> Result<(), TransportError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut transport = LineTransport::new(reader, writer);
        self.serve_transport(&mut transport).await
    }

    /// Serve over the process's standard input and output.
    pub async fn serve_stdio(&self) -> Result<(), TransportError> {
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }

    pub async fn serve_transport<R, W>(
        &self,
        transport: &mut LineTransport<R, W>,
    ) -> Result<(), TransportError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        tracing::info!(
            name = %self.server_name,
            version = %self.server_version,
            "starting MCP server"
        );

        while let Some(line) = transport.read_line().await? {
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            let resp = self.handle_message(&line).await;
            transport.write_response(&resp).await?;
        }

        tracing::info!("input closed, shutting down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::ReadBuf;

    #[tokio::test]
    async fn read_single_line() {
        let input: &[u8] = b"{\"jsonrpc\":\"2.0\"}\n";
        let mut transport = LineTransport::new(input, Vec::new());

        let line = transport.read_line().await.expect("read");
        assert_eq!(line.as_deref(), Some(&b"{\"jsonrpc\":\"2.0\"}"[..]));
    }

    #[tokio::test]
    async fn read_eof_returns_none() {
        let input: &[u8] = b"";
        let mut transport = LineTransport::new(input, Vec::new());

        assert_eq!(transport.read_line().await.expect("read"), None);
    }

    #[tokio::test]
    async fn read_strips_crlf_and_handles_missing_final_newline() {
        let input: &[u8] = b"one\r\ntwo";
        let mut transport = LineTransport::new(input, Vec::new());

        assert_eq!(transport.read_line().await.unwrap(), Some(b"one".to_vec()));
        assert_eq!(transport.read_line().await.unwrap(), Some(b"two".to_vec()));
        assert_eq!(transport.read_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn write_appends_newline() {
        let input: &[u8] = b"";
        let mut transport = LineTransport::new(input, Vec::new());

        transport.write_line(b"{\"ok\":true}").await.expect("write");

        let (_, out) = transport.into_inner();
        assert_eq!(String::from_utf8(out).unwrap(), "{\"ok\":true}\n");
    }

    #[tokio::test]
    async fn notification_writes_nothing() {
        let input: &[u8] = b"";
        let mut transport = LineTransport::new(input, Vec::new());

        transport
            .write_response(&McpResponse::notification())
            .await
            .expect("write");

        let (_, out) = transport.into_inner();
        assert!(out.is_empty());
    }

    /// Yields `data` once, then fails every read.
    struct BrokenReader {
        data: &'static [u8],
    }

    impl AsyncRead for BrokenReader {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            if self.data.is_empty() {
                return Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "stdin gone")));
            }
            let n = self.data.len().min(buf.remaining());
            buf.put_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Poll::Ready(Ok(()))
        }
    }

    /// Rejects every write.
    struct BrokenWriter;

    impl AsyncWrite for BrokenWriter {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "stdout gone")))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    fn server() -> Server {
        Server::builder().build().unwrap()
    }

    #[tokio::test]
    async fn read_failure_ends_loop_after_answering_earlier_lines() {
        let reader = BrokenReader {
            data: b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\n",
        };
        let mut output = Vec::new();

        let err = server().serve(reader, &mut output).await.unwrap_err();
        assert!(matches!(err, TransportError::Read(_)), "got {err:?}");

        let out = String::from_utf8(output).unwrap();
        assert_eq!(out, "{\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{}}\n");
    }

    #[tokio::test]
    async fn write_failure_ends_loop() {
        let input: &[u8] = b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\n\
                             {\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"ping\"}\n";

        let err = server().serve(input, BrokenWriter).await.unwrap_err();
        assert!(matches!(err, TransportError::Write(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn notifications_only_input_writes_nothing_to_broken_writer() {
        let input: &[u8] = b"{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n";
        server().serve(input, BrokenWriter).await.unwrap();
    }
}
