// ABOUTME: Breakpoint reconciler: diff requested lines against the acknowledged set
// ABOUTME: Local state mutates only on target ACK so it mirrors the agent exactly

use crate::client::error::{DebugError, DebugResult};
use crate::client::session::SessionInner;
use crate::datatypes::wire_string::{put_wire_string, wire_string_len};
use crate::datatypes::{Command, LineInfo};
use bytes::{BufMut, BytesMut};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

/// A breakpoint acknowledged by the agent.
///
/// `line` and `source_path` are the front-end's requested location, kept
/// for diffing; `line_info` is the resolved code position actually planted.
#[derive(Debug, Clone)]
pub(crate) struct Breakpoint {
    pub(crate) line: u32,
    pub(crate) source_path: String,
    pub(crate) line_info: LineInfo,
}

/// `pc:u32 LE | str(class) | str(method) | str(descriptor)` with class
/// names normalized to slash form.
fn breakpoint_payload(line_info: &LineInfo) -> BytesMut {
    let class_name = line_info.class_name.replace('\\', "/");
    let mut payload = BytesMut::with_capacity(
        4 + wire_string_len(&class_name)
            + wire_string_len(&line_info.method_name)
            + wire_string_len(&line_info.descriptor),
    );
    payload.put_u32_le(line_info.pc);
    put_wire_string(&mut payload, &class_name);
    put_wire_string(&mut payload, &line_info.method_name);
    put_wire_string(&mut payload, &line_info.descriptor);
    payload
}

/// Reconcile the agent's breakpoints for `source_path` against `lines`.
///
/// Computes the add/remove diff against the acknowledged set, removes
/// first, then adds. Every wire failure or unresolvable line
/// short-circuits; whatever was acknowledged up to that point stays
/// recorded, so a retry re-diffs from truth.
pub(crate) async fn set_breakpoints<S, L>(
    inner: &Arc<SessionInner<S, L>>,
    lines: &[u32],
    source_path: &str,
) -> DebugResult<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
    L: crate::loader::ClassLoader,
{
    let (to_remove, new_lines) = {
        let state = inner.lock_state();
        let to_remove: Vec<Breakpoint> = state
            .breakpoints
            .iter()
            .filter(|bp| bp.source_path == source_path && !lines.contains(&bp.line))
            .cloned()
            .collect();
        let new_lines: Vec<u32> = lines
            .iter()
            .copied()
            .filter(|&line| {
                !state
                    .breakpoints
                    .iter()
                    .any(|bp| bp.source_path == source_path && bp.line == line)
            })
            .collect();
        (to_remove, new_lines)
    };

    let mut to_add = Vec::with_capacity(new_lines.len());
    for line in new_lines {
        let line_info = inner
            .loader
            .line_info_from_line(line, source_path)
            .ok_or_else(|| DebugError::LineNotResolved {
                line,
                source_path: source_path.to_string(),
            })?;
        to_add.push(Breakpoint {
            line,
            source_path: source_path.to_string(),
            line_info,
        });
    }

    for bp in to_remove {
        let payload = breakpoint_payload(&bp.line_info);
        inner
            .request(
                Command::RemoveBreakpoint,
                &payload,
                inner.config.command_timeout,
            )
            .await?;
        debug!(line = bp.line, source = %bp.source_path, "breakpoint removed");
        inner.lock_state().breakpoints.retain(|existing| {
            !(existing.source_path == bp.source_path && existing.line == bp.line)
        });
    }

    for bp in to_add {
        let payload = breakpoint_payload(&bp.line_info);
        inner
            .request(
                Command::AddBreakpoint,
                &payload,
                inner.config.command_timeout,
            )
            .await?;
        debug!(
            line = bp.line,
            source = %bp.source_path,
            pc = bp.line_info.pc,
            "breakpoint added"
        );
        inner.lock_state().breakpoints.push(bp);
    }

    Ok(())
}

/// Clear every breakpoint on the agent, then forget the local set.
pub(crate) async fn remove_all_breakpoints<S, L>(
    inner: &Arc<SessionInner<S, L>>,
) -> DebugResult<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
    L: crate::loader::ClassLoader,
{
    inner
        .request(
            Command::RemoveAllBreakpoints,
            &[],
            inner.config.command_timeout,
        )
        .await?;
    inner.lock_state().breakpoints.clear();
    Ok(())
}
