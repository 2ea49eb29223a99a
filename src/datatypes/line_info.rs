// ABOUTME: Source-line binding and member metadata resolved by the class loader
// ABOUTME: Carries the (class, method, descriptor, pc) tuple the wire protocol addresses

/// Binding from a source location to an executable position.
///
/// Produced by the [`ClassLoader`](crate::loader::ClassLoader) either from a
/// `(line, source_path)` pair when planting breakpoints or from a
/// `(pc, class, method, descriptor)` tuple when walking the stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineInfo {
    /// Slash-form class name, e.g. `com/acme/Main`
    pub class_name: String,
    pub method_name: String,
    /// Method descriptor, e.g. `([Ljava/lang/String;)V`
    pub descriptor: String,
    /// Bytecode offset within the method
    pub pc: u32,
    /// 1-based source line
    pub line: u32,
    /// On-disk path of the source file, when known
    pub source_path: Option<String>,
    /// Length of the method's bytecode, used as a step hint
    pub code_length: u32,
    /// The method's full local-variable table
    pub local_variables: Vec<LocalVar>,
}

/// One entry of a method's local-variable table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalVar {
    pub name: String,
    pub descriptor: String,
    /// Slot index in the frame's locals area
    pub index: u16,
    pub start_pc: u32,
    pub length: u32,
}

impl LocalVar {
    /// Whether the variable is live at `pc`; the scope is
    /// `[start_pc, start_pc + length)`.
    pub fn in_scope(&self, pc: u32) -> bool {
        pc >= self.start_pc && pc < self.start_pc.saturating_add(self.length)
    }
}

/// One field of a loaded class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    pub name: String,
    pub descriptor: String,
    pub access_flags: u16,
}

impl FieldInfo {
    const ACC_STATIC: u16 = 0x0008;

    pub fn is_static(&self) -> bool {
        self.access_flags & Self::ACC_STATIC != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_var_scope_is_half_open() {
        let lv = LocalVar {
            name: "i".into(),
            descriptor: "I".into(),
            index: 1,
            start_pc: 10,
            length: 5,
        };
        assert!(!lv.in_scope(9));
        assert!(lv.in_scope(10));
        assert!(lv.in_scope(14));
        assert!(!lv.in_scope(15));
    }

    #[test]
    fn static_flag() {
        let field = FieldInfo {
            name: "CACHE".into(),
            descriptor: "I".into(),
            access_flags: 0x0008 | 0x0002,
        };
        assert!(field.is_static());
    }
}
