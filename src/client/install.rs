// ABOUTME: Chunked file upload: begin/write/complete handshake with progress callbacks

use crate::client::error::DebugResult;
use crate::client::session::SessionInner;
use crate::datatypes::Command;
use crate::datatypes::wire_string::{put_wire_string, wire_string_len};
use crate::loader::ClassLoader;
use bytes::BytesMut;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

/// Largest WRITE_FILE_DATA payload the agent accepts.
const CHUNK_SIZE: usize = 512;

/// Upload `data` as `file_name` on the target.
///
/// Three-step handshake: INSTALL_FILE with the name, WRITE_FILE_DATA per
/// 512-byte chunk, COMPLETE_INSTALL. Each step uses the install timeout.
/// `progress(bytes_sent, total)` fires after every acknowledged chunk and
/// once more on completion; any failed step aborts the upload.
pub(crate) async fn install_file<S, L>(
    inner: &Arc<SessionInner<S, L>>,
    file_name: &str,
    data: &[u8],
    mut progress: impl FnMut(usize, usize),
) -> DebugResult<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
    L: ClassLoader,
{
    let timeout = inner.config.install_timeout;

    let mut payload = BytesMut::with_capacity(wire_string_len(file_name));
    put_wire_string(&mut payload, file_name);
    inner.request(Command::InstallFile, &payload, timeout).await?;
    debug!(file = %file_name, total = data.len(), "install started");

    let total = data.len();
    let mut sent = 0;
    for chunk in data.chunks(CHUNK_SIZE) {
        inner.request(Command::WriteFileData, chunk, timeout).await?;
        sent += chunk.len();
        progress(sent, total);
    }

    inner.request(Command::CompleteInstall, &[], timeout).await?;
    progress(total, total);
    debug!(file = %file_name, "install complete");
    Ok(())
}
