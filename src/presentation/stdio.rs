// Stdio transport - MCP session over stdin/stdout
use crate::presentation::mcp::DashboardServer;
use rmcp::ServiceExt;
use serde::de::IgnoredAny;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, DuplexStream};

const INPUT_BUFFER: usize = 64 * 1024;

pub async fn serve_stdio(server: DashboardServer) -> anyhow::Result<()> {
    tracing::info!("Serving MCP over stdio");
    let service = server
        .serve((guarded(tokio::io::stdin()), tokio::io::stdout()))
        .await
        .map_err(|e| anyhow::anyhow!("failed to start MCP session: {}", e))?;
    service.waiting().await?;
    tracing::info!("stdin closed, shutting down");
    Ok(())
}

/// Hands the session a copy of `reader` holding only lines that parse as
/// JSON, so a corrupt line is dropped instead of ending the session.
pub fn guarded<R>(reader: R) -> DuplexStream
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let (mut input, output) = tokio::io::duplex(INPUT_BUFFER);
    tokio::spawn(async move {
        if let Err(e) = forward_json_lines(reader, &mut input).await {
            tracing::error!("Failed to read MCP input: {}", e);
        }
    });
    output
}

async fn forward_json_lines<R, W>(reader: R, writer: &mut W) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut line = Vec::new();

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            return Ok(());
        }

        let frame = line.trim_ascii();
        if frame.is_empty() {
            continue;
        }
        if let Err(e) = serde_json::from_slice::<IgnoredAny>(frame) {
            tracing::warn!("Dropping malformed input line ({} bytes): {}", frame.len(), e);
            continue;
        }

        writer.write_all(frame).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }
}
