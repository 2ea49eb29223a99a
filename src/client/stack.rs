// ABOUTME: Stack walker: per-frame READ_STACK_TRACE decoding and the cached trace
// ABOUTME: Renders front-end rows with short method signatures and pc references

use crate::client::error::{DebugError, DebugResult};
use crate::client::session::SessionInner;
use crate::client::types::StackTraceEntry;
use crate::datatypes::wire_string::{get_bare_name_string, get_name_string};
use crate::datatypes::{Command, StackFrame, descriptor};
use crate::loader::ClassLoader;
use bytes::Buf;
use std::io::Cursor;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

/// Upper bound on the walk so a misbehaving agent that never reports an
/// end frame cannot spin the client forever.
const MAX_FRAMES: u32 = 256;

const END_FRAME_BIT: u32 = 0x8000_0000;

struct RawFrame {
    pc: u32,
    class_name: String,
    method_name: String,
    descriptor: String,
    is_end_frame: bool,
}

/// Parse a READ_STACK_TRACE response body. `Ok(None)` when the echoed
/// frame index does not match the request.
fn parse_frame(data: &[u8], frame_id: u32) -> Result<Option<RawFrame>, crate::codec::CodecError> {
    let mut cur = Cursor::new(data);
    if cur.remaining() < 8 {
        return Err(crate::codec::CodecError::Incomplete);
    }
    let raw_index = cur.get_u32_le();
    let pc = cur.get_u32_le();
    let is_end_frame = raw_index & END_FRAME_BIT != 0;
    if raw_index & !END_FRAME_BIT != frame_id {
        return Ok(None);
    }
    let class_name = get_name_string(&mut cur, "class name")?;
    let method_name = get_name_string(&mut cur, "method name")?;
    let descriptor = get_bare_name_string(&mut cur, "descriptor")?;
    Ok(Some(RawFrame {
        pc,
        class_name,
        method_name,
        descriptor,
        is_end_frame,
    }))
}

/// Fetch and decode one stack frame. `Ok(None)` when the agent echoes a
/// different frame index or the pc does not resolve to line info.
pub(crate) async fn read_stack_frame<S, L>(
    inner: &Arc<SessionInner<S, L>>,
    frame_id: u32,
) -> DebugResult<Option<StackFrame>>
where
    S: AsyncRead + AsyncWrite + Unpin,
    L: ClassLoader,
{
    let response = inner
        .request(
            Command::ReadStackTrace,
            &frame_id.to_le_bytes(),
            inner.config.command_timeout,
        )
        .await?;

    let raw = parse_frame(&response.data, frame_id)
        .map_err(|_| DebugError::MalformedResponse(Command::ReadStackTrace))?;
    let Some(raw) = raw else {
        debug!(frame_id, "frame index mismatch");
        return Ok(None);
    };

    let Some(line_info) = inner.loader.line_info_from_pc(
        raw.pc,
        &raw.class_name,
        &raw.method_name,
        &raw.descriptor,
    ) else {
        debug!(frame_id, pc = raw.pc, class = %raw.class_name, "pc did not resolve");
        return Ok(None);
    };

    let in_scope: Vec<_> = line_info
        .local_variables
        .iter()
        .filter(|lv| lv.in_scope(raw.pc))
        .cloned()
        .collect();
    Ok(Some(StackFrame {
        frame_id,
        line_info,
        is_end_frame: raw.is_end_frame,
        local_variables: (!in_scope.is_empty()).then_some(in_scope),
    }))
}

/// The full stack trace in front-end shape.
///
/// Walks from frame 0 until the end frame or a frame without a source
/// path, then caches the frames until run control invalidates them.
pub(crate) async fn stack_frame_request<S, L>(
    inner: &Arc<SessionInner<S, L>>,
) -> DebugResult<Vec<StackTraceEntry>>
where
    S: AsyncRead + AsyncWrite + Unpin,
    L: ClassLoader,
{
    if let Some(frames) = inner.lock_state().stack_frames.as_deref() {
        return Ok(render(frames));
    }

    let mut frames = Vec::new();
    for frame_id in 0..MAX_FRAMES {
        let Some(frame) = read_stack_frame(inner, frame_id).await? else {
            break;
        };
        if frame.line_info.source_path.is_none() {
            break;
        }
        let is_end = frame.is_end_frame;
        frames.push(frame);
        if is_end {
            break;
        }
    }

    let entries = render(&frames);
    inner.lock_state().stack_frames = Some(frames);
    Ok(entries)
}

fn render(frames: &[StackFrame]) -> Vec<StackTraceEntry> {
    frames
        .iter()
        .map(|frame| {
            let line_info = &frame.line_info;
            let short_class = descriptor::simple_name(&line_info.class_name);
            let params = descriptor::parameter_names(&line_info.descriptor).join(", ");
            StackTraceEntry {
                id: frame.frame_id,
                name: format!("{short_class}.{}({params})", line_info.method_name),
                source_name: format!("{short_class}.java"),
                source_path: line_info.source_path.clone().unwrap_or_default(),
                line: line_info.line,
                instruction_pointer_reference: line_info.pc.to_string(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatypes::{LineInfo, LocalVar};
    use bytes::{BufMut, BytesMut};

    fn frame_body(index: u32, pc: u32, class: &str, method: &str, descriptor: &str) -> Vec<u8> {
        let mut buf = BytesMut::new();
        buf.put_u32_le(index);
        buf.put_u32_le(pc);
        for name in [class, method] {
            buf.put_u16_le(name.len() as u16);
            buf.put_u16_le(0);
            buf.put_slice(name.as_bytes());
            buf.put_u8(0);
        }
        buf.put_u16_le(descriptor.len() as u16);
        buf.put_u16_le(0);
        buf.put_slice(descriptor.as_bytes());
        buf.to_vec()
    }

    #[test]
    fn parses_frame_with_end_bit() {
        let body = frame_body(END_FRAME_BIT | 3, 42, "com/acme/Main", "main", "()V");
        let raw = parse_frame(&body, 3).unwrap().unwrap();
        assert!(raw.is_end_frame);
        assert_eq!(raw.pc, 42);
        assert_eq!(raw.class_name, "com/acme/Main");
        assert_eq!(raw.method_name, "main");
        assert_eq!(raw.descriptor, "()V");
    }

    #[test]
    fn frame_index_mismatch_is_none() {
        let body = frame_body(2, 42, "Foo", "bar", "()V");
        assert!(parse_frame(&body, 3).unwrap().is_none());
    }

    #[test]
    fn truncated_frame_is_error() {
        let body = frame_body(0, 42, "Foo", "bar", "()V");
        assert!(parse_frame(&body[..10], 0).is_err());
    }

    #[test]
    fn render_formats_signature_and_source() {
        let frame = StackFrame {
            frame_id: 0,
            line_info: LineInfo {
                class_name: "com/acme/Main".into(),
                method_name: "run".into(),
                descriptor: "(I[Ljava/lang/String;)V".into(),
                pc: 7,
                line: 12,
                source_path: Some("/src/Main.java".into()),
                code_length: 64,
                local_variables: vec![LocalVar {
                    name: "this".into(),
                    descriptor: "Lcom/acme/Main;".into(),
                    index: 0,
                    start_pc: 0,
                    length: 64,
                }],
            },
            is_end_frame: false,
            local_variables: None,
        };
        let rows = render(std::slice::from_ref(&frame));
        assert_eq!(rows[0].name, "Main.run(int, String[])");
        assert_eq!(rows[0].source_name, "Main.java");
        assert_eq!(rows[0].source_path, "/src/Main.java");
        assert_eq!(rows[0].line, 12);
        assert_eq!(rows[0].instruction_pointer_reference, "7");
    }
}
