use std::io;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, error};

use crate::http::parser::is_transient;

/// Default ceiling on the bytes handed to a single write call.
pub const SEND_CHUNK: usize = 1024;

/// Writes all of `buf`, issuing write calls of at most `chunk` bytes.
///
/// Transient errors are retried. The first hard failure is returned as-is and
/// nothing after it is attempted; how much was already written is not reported.
pub async fn send_all<S>(stream: &mut S, buf: &[u8], chunk: usize) -> io::Result<()>
where
    S: AsyncWrite + Unpin + ?Sized,
{
    let chunk = chunk.max(1);
    let mut written = 0;

    while written < buf.len() {
        let end = buf.len().min(written.saturating_add(chunk));
        match stream.write(&buf[written..end]).await {
            Ok(0) => {
                error!(written, total = buf.len(), "connection closed while writing");
                return Err(io::ErrorKind::WriteZero.into());
            }
            Ok(n) => {
                debug!(sent = n, "sent");
                written += n;
            }
            Err(e) if is_transient(&e) => {
                debug!(error = %e, "send interrupted, retrying");
            }
            Err(e) => {
                error!(error = %e, "send failed");
                return Err(e);
            }
        }
    }

    Ok(())
}
