// ABOUTME: Value decoder: locals, fields, arrays, and string materialization
// ABOUTME: Maintains the session-scoped variable-reference table for lazy expansion

use crate::client::error::{DebugError, DebugResult};
use crate::client::session::{SessionInner, SessionState};
use crate::client::stack;
use crate::client::types::Variable;
use crate::datatypes::wire_string::{get_bare_name_string, put_wire_string, wire_string_len};
use crate::datatypes::{Command, Value, ValueInfo, descriptor};
use crate::loader::ClassLoader;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::Cursor;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

const STRING_CLASS: &str = "java/lang/String";
const STRING_BUILDER_BASE: &str = "java/lang/AbstractStringBuilder";

/// Bit 31 of the READ_LOCAL frame word requests a 64-bit value.
const WIDE_FLAG: u32 = 0x8000_0000;

/// Raw READ_LOCAL / READ_FIELD response: `size:u32 | value | [type name]`.
struct RawSlot {
    size: u32,
    raw: u64,
    type_name: Option<String>,
}

fn parse_slot(data: &[u8], wide: bool) -> Option<RawSlot> {
    let mut cur = Cursor::new(data);
    if cur.remaining() < 4 {
        return None;
    }
    let size = cur.get_u32_le();
    let raw = if wide {
        if cur.remaining() < 8 {
            return None;
        }
        cur.get_u64_le()
    } else {
        if cur.remaining() < 4 {
            return None;
        }
        u64::from(cur.get_u32_le())
    };
    // The agent appends the runtime type name when it fits.
    let type_name = if cur.remaining() >= 4 {
        get_bare_name_string(&mut cur, "type name").ok()
    } else {
        None
    };
    Some(RawSlot {
        size,
        raw,
        type_name,
    })
}

fn primitive_value(desc: &str, raw: u64) -> Value {
    match desc {
        "Z" => Value::Bool(raw != 0),
        "C" => Value::Char(raw as u16),
        // B and S arrive in a 32-bit slot; sign-narrow from the low bits
        "B" => Value::Int(i32::from(raw as u8 as i8)),
        "S" => Value::Int(i32::from(raw as u16 as i16)),
        "F" => Value::Float(f32::from_bits(raw as u32)),
        "D" => Value::Double(f64::from_bits(raw)),
        "J" => Value::Long(raw as i64),
        _ => Value::Int(raw as u32 as i32),
    }
}

/// Insert a decoded value into the ref table when it is expandable.
///
/// Strings are leaves even though they hold a live reference, so they are
/// never registered; expanding one returns nothing.
fn register(state: &mut SessionState, info: &ValueInfo) -> u32 {
    if info.reference != 0
        && !matches!(info.value, Value::Str(_))
        && !descriptor::is_primitive(&info.ty)
    {
        state.variable_refs.insert(info.reference, info.clone());
        info.reference
    } else {
        0
    }
}

fn to_variable(info: &ValueInfo, reference: u32) -> Variable {
    Variable {
        name: info.name.clone(),
        value: info.display_value(),
        variables_reference: reference,
    }
}

async fn read_local_slot<S, L>(
    inner: &Arc<SessionInner<S, L>>,
    frame_id: u32,
    index: u16,
    wide: bool,
) -> Option<RawSlot>
where
    S: AsyncRead + AsyncWrite + Unpin,
    L: ClassLoader,
{
    let mut payload = BytesMut::with_capacity(8);
    payload.put_u32_le(frame_id | if wide { WIDE_FLAG } else { 0 });
    payload.put_u32_le(u32::from(index));
    let response = inner
        .transport
        .send_cmd(Command::ReadLocal, &payload, inner.config.command_timeout)
        .await?;
    if !response.is_ok() {
        return None;
    }
    parse_slot(&response.data, wide)
}

async fn read_field_slot<S, L>(
    inner: &Arc<SessionInner<S, L>>,
    reference: u32,
    field_name: &str,
    wide: bool,
) -> Option<RawSlot>
where
    S: AsyncRead + AsyncWrite + Unpin,
    L: ClassLoader,
{
    let mut payload = BytesMut::with_capacity(4 + wire_string_len(field_name));
    payload.put_u32_le(reference);
    put_wire_string(&mut payload, field_name);
    let response = inner
        .transport
        .send_cmd(Command::ReadField, &payload, inner.config.command_timeout)
        .await?;
    if !response.is_ok() {
        return None;
    }
    parse_slot(&response.data, wide)
}

async fn read_size_and_type<S, L>(
    inner: &Arc<SessionInner<S, L>>,
    reference: u32,
) -> Option<(u32, String)>
where
    S: AsyncRead + AsyncWrite + Unpin,
    L: ClassLoader,
{
    let response = inner
        .transport
        .send_cmd(
            Command::ReadSizeAndType,
            &reference.to_le_bytes(),
            inner.config.command_timeout,
        )
        .await?;
    if !response.is_ok() {
        return None;
    }
    let mut cur = Cursor::new(response.data.as_ref());
    if cur.remaining() < 4 {
        return None;
    }
    let size = cur.get_u32_le();
    let type_name = get_bare_name_string(&mut cur, "type name").ok()?;
    Some((size, type_name))
}

/// `length:u32 | startIndex:u32 | reference:u32`; the response is the raw
/// element bytes.
async fn read_array_raw<S, L>(
    inner: &Arc<SessionInner<S, L>>,
    reference: u32,
    start: u32,
    count: u32,
) -> Option<Bytes>
where
    S: AsyncRead + AsyncWrite + Unpin,
    L: ClassLoader,
{
    let mut payload = BytesMut::with_capacity(12);
    payload.put_u32_le(count);
    payload.put_u32_le(start);
    payload.put_u32_le(reference);
    let response = inner
        .transport
        .send_cmd(Command::ReadArray, &payload, inner.config.command_timeout)
        .await?;
    response.is_ok().then_some(response.data)
}

/// Decode one local or field slot into a [`ValueInfo`].
async fn decode_slot<S, L>(
    inner: &Arc<SessionInner<S, L>>,
    name: String,
    declared: &str,
    slot: RawSlot,
) -> Option<ValueInfo>
where
    S: AsyncRead + AsyncWrite + Unpin,
    L: ClassLoader,
{
    if descriptor::is_primitive(declared) {
        return Some(ValueInfo {
            name,
            ty: declared.to_string(),
            value: primitive_value(declared, slot.raw),
            size: slot.size,
            reference: 0,
        });
    }

    let reference = slot.raw as u32;
    if reference == 0 {
        return Some(ValueInfo {
            name,
            ty: descriptor::type_name(declared).to_string(),
            value: Value::Null,
            size: 0,
            reference: 0,
        });
    }

    // Prefer the runtime type the agent reported over the declared one; it
    // matters for string detection behind Object-typed slots.
    let (size, ty) = match slot.type_name {
        Some(ty) => (slot.size, ty),
        None => match read_size_and_type(inner, reference).await {
            Some((size, ty)) => (size, ty),
            None => (slot.size, declared.to_string()),
        },
    };
    let ty = descriptor::type_name(&ty).to_string();

    let value = match try_read_string(inner, reference, &ty).await {
        Some(text) => Value::Str(text),
        None => Value::Reference(reference),
    };
    Some(ValueInfo {
        name,
        ty,
        value,
        size,
        reference,
    })
}

/// Materialize a `String`/`StringBuilder`-like object into its text.
///
/// Reads the `coder` and `value` fields; builders additionally carry
/// `count`, bounding the live prefix at `count << coder` bytes. `None`
/// means "not a string after all" and the caller falls back to a plain
/// object reference.
async fn try_read_string<S, L>(
    inner: &Arc<SessionInner<S, L>>,
    reference: u32,
    ty: &str,
) -> Option<String>
where
    S: AsyncRead + AsyncWrite + Unpin,
    L: ClassLoader,
{
    let class_name = descriptor::object_class_name(ty)?;
    let is_string = inner.loader.is_instance_of(class_name, STRING_CLASS);
    let is_builder = inner.loader.is_instance_of(class_name, STRING_BUILDER_BASE);
    if !is_string && !is_builder {
        return None;
    }

    let coder = read_field_slot(inner, reference, "coder", false).await?.raw as u8;
    if coder > 1 {
        return None;
    }
    let value_ref = read_field_slot(inner, reference, "value", false).await?.raw as u32;
    if value_ref == 0 {
        return None;
    }

    let byte_len = if is_builder {
        let count = read_field_slot(inner, reference, "count", false).await?.raw as u32;
        count << coder
    } else {
        read_size_and_type(inner, value_ref).await?.0
    };
    if byte_len == 0 {
        return Some(String::new());
    }

    let bytes = read_array_raw(inner, value_ref, 0, byte_len).await?;
    decode_text(&bytes, coder)
}

fn decode_text(bytes: &[u8], coder: u8) -> Option<String> {
    match coder {
        // compact latin-1
        0 => Some(bytes.iter().map(|&b| char::from(b)).collect()),
        // UTF-16LE code units
        1 => {
            let units: Vec<u16> = bytes
                .chunks_exact(2)
                .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                .collect();
            Some(String::from_utf16_lossy(&units))
        }
        _ => None,
    }
}

/// Decode every in-scope local of `frame_id`.
///
/// Clears the variable-reference table first: references handed out
/// earlier are valid only until the next call. Per-local failures yield
/// `"not available"` placeholders instead of failing the batch.
pub(crate) async fn read_local_variables<S, L>(
    inner: &Arc<SessionInner<S, L>>,
    frame_id: u32,
) -> DebugResult<Vec<Variable>>
where
    S: AsyncRead + AsyncWrite + Unpin,
    L: ClassLoader,
{
    inner.lock_state().variable_refs.clear();

    let cached = inner
        .lock_state()
        .stack_frames
        .as_ref()
        .and_then(|frames| frames.get(frame_id as usize).cloned());
    let frame = match cached {
        Some(frame) => Some(frame),
        None => stack::read_stack_frame(inner, frame_id).await?,
    };
    let Some(frame) = frame else {
        return Err(DebugError::UnknownFrame(frame_id));
    };

    let mut out = Vec::new();
    for local in frame.local_variables.iter().flatten() {
        let wide = descriptor::is_wide(&local.descriptor);
        let decoded = match read_local_slot(inner, frame_id, local.index, wide).await {
            Some(slot) => decode_slot(inner, local.name.clone(), &local.descriptor, slot).await,
            None => None,
        };
        match decoded {
            Some(info) => {
                let reference = register(&mut inner.lock_state(), &info);
                out.push(to_variable(&info, reference));
            }
            None => {
                debug!(name = %local.name, frame_id, "local did not decode");
                out.push(Variable::not_available(local.name.clone()));
            }
        }
    }
    Ok(out)
}

/// Expand a variable reference handed out by a previous decode.
///
/// `Ok(None)` for unknown handles and non-expandable values, matching the
/// front-end contract that leaves carry `variables_reference == 0`.
pub(crate) async fn read_variable<S, L>(
    inner: &Arc<SessionInner<S, L>>,
    reference: u32,
) -> DebugResult<Option<Vec<Variable>>>
where
    S: AsyncRead + AsyncWrite + Unpin,
    L: ClassLoader,
{
    let entry = inner.lock_state().variable_refs.get(&reference).cloned();
    let Some(info) = entry else {
        return Ok(None);
    };
    if descriptor::is_primitive(&info.ty) {
        return Ok(None);
    }

    if descriptor::is_array(&info.ty) {
        expand_array(inner, &info).await.map(Some)
    } else {
        expand_object(inner, &info).await.map(Some)
    }
}

async fn expand_array<S, L>(
    inner: &Arc<SessionInner<S, L>>,
    info: &ValueInfo,
) -> DebugResult<Vec<Variable>>
where
    S: AsyncRead + AsyncWrite + Unpin,
    L: ClassLoader,
{
    let element = &info.ty[1..];
    let element_size = descriptor::element_size(element);
    let count = info.size / element_size;
    let data = read_array_raw(inner, info.reference, 0, count)
        .await
        .ok_or(DebugError::CommandFailed(Command::ReadArray))?;

    let mut out = Vec::new();
    match element_size {
        1 => {
            for (i, &byte) in data.iter().enumerate() {
                let value = if element == "Z" {
                    Value::Bool(byte != 0)
                } else {
                    Value::Int(i32::from(byte as i8))
                };
                out.push(leaf(i, value));
            }
        }
        2 => {
            for (i, pair) in data.chunks_exact(2).enumerate() {
                let raw = u16::from_le_bytes([pair[0], pair[1]]);
                let value = if element == "C" {
                    Value::Char(raw)
                } else {
                    Value::Int(i32::from(raw as i16))
                };
                out.push(leaf(i, value));
            }
        }
        8 => {
            for (i, chunk) in data.chunks_exact(8).enumerate() {
                let raw = u64::from_le_bytes([
                    chunk[0], chunk[1], chunk[2], chunk[3], chunk[4], chunk[5], chunk[6],
                    chunk[7],
                ]);
                let value = if element == "D" {
                    Value::Double(f64::from_bits(raw))
                } else {
                    Value::Long(raw as i64)
                };
                out.push(leaf(i, value));
            }
        }
        _ => {
            for (i, chunk) in data.chunks_exact(4).enumerate() {
                let raw = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                match element {
                    "I" => out.push(leaf(i, Value::Int(raw as i32))),
                    "F" => out.push(leaf(i, Value::Float(f32::from_bits(raw)))),
                    _ => out.push(expand_array_reference(inner, i, raw).await),
                }
            }
        }
    }
    Ok(out)
}

fn leaf(index: usize, value: Value) -> Variable {
    Variable {
        name: format!("[{index}]"),
        value: value.to_string(),
        variables_reference: 0,
    }
}

async fn expand_array_reference<S, L>(
    inner: &Arc<SessionInner<S, L>>,
    index: usize,
    element_ref: u32,
) -> Variable
where
    S: AsyncRead + AsyncWrite + Unpin,
    L: ClassLoader,
{
    if element_ref == 0 {
        return leaf(index, Value::Null);
    }
    let Some((size, type_name)) = read_size_and_type(inner, element_ref).await else {
        return Variable::not_available(format!("[{index}]"));
    };
    let ty = descriptor::type_name(&type_name).to_string();
    let value = match try_read_string(inner, element_ref, &ty).await {
        Some(text) => Value::Str(text),
        None => Value::Reference(element_ref),
    };
    let info = ValueInfo {
        name: format!("[{index}]"),
        ty,
        value,
        size,
        reference: element_ref,
    };
    let reference = register(&mut inner.lock_state(), &info);
    to_variable(&info, reference)
}

async fn expand_object<S, L>(
    inner: &Arc<SessionInner<S, L>>,
    info: &ValueInfo,
) -> DebugResult<Vec<Variable>>
where
    S: AsyncRead + AsyncWrite + Unpin,
    L: ClassLoader,
{
    let class_name = descriptor::object_class_name(&info.ty)
        .ok_or_else(|| DebugError::ClassNotLoaded(info.ty.clone()))?;
    let fields = inner
        .loader
        .field_list(class_name, true)
        .ok_or_else(|| DebugError::ClassNotLoaded(class_name.to_string()))?;

    let mut out = Vec::new();
    for field in fields.iter().filter(|f| !f.is_static()) {
        let wide = descriptor::is_wide(&field.descriptor);
        let decoded = match read_field_slot(inner, info.reference, &field.name, wide).await {
            Some(slot) => decode_slot(inner, field.name.clone(), &field.descriptor, slot).await,
            None => None,
        };
        match decoded {
            Some(field_info) => {
                let reference = register(&mut inner.lock_state(), &field_info);
                out.push(to_variable(&field_info, reference));
            }
            None => {
                debug!(field = %field.name, class = %class_name, "field did not decode");
                out.push(Variable::not_available(field.name.clone()));
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_parsing_widths() {
        // size=4, value=0x1000, no type tail
        let narrow = [4, 0, 0, 0, 0x00, 0x10, 0, 0];
        let slot = parse_slot(&narrow, false).unwrap();
        assert_eq!(slot.size, 4);
        assert_eq!(slot.raw, 0x1000);
        assert!(slot.type_name.is_none());

        // size=8, 64-bit value takes the low word directly
        let wide = [8, 0, 0, 0, 0xEF, 0xBE, 0xAD, 0xDE, 0x78, 0x56, 0x34, 0x12];
        let slot = parse_slot(&wide, true).unwrap();
        assert_eq!(slot.raw, 0x1234_5678_DEAD_BEEF);

        // type tail present
        let mut tailed = vec![4, 0, 0, 0, 0x20, 0, 0, 0];
        tailed.extend_from_slice(&[2, 0, 0, 0]);
        tailed.extend_from_slice(b"[I");
        let slot = parse_slot(&tailed, false).unwrap();
        assert_eq!(slot.type_name.as_deref(), Some("[I"));
    }

    #[test]
    fn primitive_decoding_boundaries() {
        assert_eq!(primitive_value("B", 0xFF), Value::Int(-1));
        assert_eq!(primitive_value("S", 0xFFFF_8000), Value::Int(-32768));
        assert_eq!(primitive_value("I", 0xFFFF_FFFF), Value::Int(-1));
        assert_eq!(primitive_value("Z", 0), Value::Bool(false));
        assert_eq!(primitive_value("Z", 2), Value::Bool(true));
        assert_eq!(primitive_value("C", 0x41), Value::Char(0x41));
        assert_eq!(
            primitive_value("F", u64::from(1.5f32.to_bits())),
            Value::Float(1.5)
        );
        assert_eq!(
            primitive_value("D", (-2.25f64).to_bits()),
            Value::Double(-2.25)
        );
        assert_eq!(primitive_value("J", u64::MAX), Value::Long(-1));
    }

    #[test]
    fn latin1_and_utf16_text() {
        assert_eq!(decode_text(&[0x48, 0x69], 0).unwrap(), "Hi");
        assert_eq!(decode_text(&[0xE9], 0).unwrap(), "é");
        assert_eq!(decode_text(&[0x48, 0x00, 0x69, 0x00], 1).unwrap(), "Hi");
        assert_eq!(decode_text(&[0x3D, 0xD8, 0x00, 0xDE], 1).unwrap(), "\u{1F600}");
        assert!(decode_text(&[0x00], 2).is_none());
    }
}
