// ABOUTME: Class-file descriptor grammar helpers for sizing and display
// ABOUTME: Covers element sizes, simple-name decoding, and method parameter lists

/// Element size in bytes for an array whose elements have this descriptor.
///
/// `Z`/`B` are stored as one byte, `C`/`S` as two, `J`/`D` as eight;
/// everything else (including references) occupies four bytes.
pub fn element_size(descriptor: &str) -> u32 {
    match descriptor.as_bytes().first() {
        Some(b'Z' | b'B') => 1,
        Some(b'C' | b'S') => 2,
        Some(b'J' | b'D') => 8,
        _ => 4,
    }
}

/// True for the single-letter primitive descriptors.
pub fn is_primitive(ty: &str) -> bool {
    matches!(ty, "Z" | "B" | "C" | "S" | "I" | "F" | "J" | "D")
}

/// True for array types, in either descriptor (`[I`) or runtime-name form.
pub fn is_array(ty: &str) -> bool {
    ty.starts_with('[')
}

/// True for the 8-byte primitive descriptors.
pub fn is_wide(descriptor: &str) -> bool {
    matches!(descriptor, "J" | "D")
}

/// Normalize a field descriptor or runtime type name to the bare form used
/// throughout the session: `Ljava/lang/String;` becomes `java/lang/String`,
/// arrays and primitives pass through unchanged.
pub fn type_name(ty: &str) -> &str {
    match ty.strip_prefix('L').and_then(|t| t.strip_suffix(';')) {
        Some(inner) if !ty.starts_with('[') => inner,
        _ => ty,
    }
}

/// The slash-form class name behind an object type, if it is one.
///
/// Accepts both `Ljava/lang/String;` and bare `java/lang/String`; returns
/// `None` for primitives and arrays.
pub fn object_class_name(ty: &str) -> Option<&str> {
    if is_primitive(ty) || is_array(ty) || ty.is_empty() {
        return None;
    }
    Some(type_name(ty))
}

/// Human-readable short type name for a descriptor fragment.
///
/// `[I` becomes `int[]`, `Ljava/lang/String;` becomes `String`,
/// `[[Lcom/acme/Foo;` becomes `Foo[][]`. Bare runtime names are accepted
/// too. Unrecognised input falls through as its own display.
pub fn simple_name(ty: &str) -> String {
    let mut dims = 0usize;
    let mut rest = ty;
    while let Some(inner) = rest.strip_prefix('[') {
        dims += 1;
        rest = inner;
    }
    let base = match rest {
        "Z" => "boolean",
        "B" => "byte",
        "C" => "char",
        "S" => "short",
        "I" => "int",
        "F" => "float",
        "J" => "long",
        "D" => "double",
        other => {
            let name = type_name(other);
            name.rsplit(['/', '.']).next().unwrap_or(name)
        }
    };
    let mut out = String::from(base);
    for _ in 0..dims {
        out.push_str("[]");
    }
    out
}

/// Short names of a method descriptor's parameter types, for frame display.
///
/// `(I[Ljava/lang/String;)V` yields `["int", "String[]"]`. A malformed
/// descriptor yields the parameters parsed up to the malformation.
pub fn parameter_names(method_descriptor: &str) -> Vec<String> {
    let Some(inner) = method_descriptor
        .strip_prefix('(')
        .and_then(|d| d.split(')').next())
    else {
        return Vec::new();
    };

    let mut out = Vec::new();
    let bytes = inner.as_bytes();
    let mut pos = 0;
    while pos < bytes.len() {
        let start = pos;
        while pos < bytes.len() && bytes[pos] == b'[' {
            pos += 1;
        }
        match bytes.get(pos) {
            Some(b'L') => {
                let Some(end) = inner[pos..].find(';') else {
                    break;
                };
                pos += end + 1;
            }
            Some(_) => pos += 1,
            None => break,
        }
        out.push(simple_name(&inner[start..pos]));
    }
    out
}
