// ABOUTME: The class-metadata service the session consumes
// ABOUTME: Resolves source lines to code positions and classes to field lists

use crate::datatypes::{FieldInfo, LineInfo};

/// Class-file metadata resolver supplied by the embedder.
///
/// The session uses it to turn line-level breakpoint requests into
/// `(class, method, descriptor, pc)` tuples, to bind stack-frame pcs back
/// to source lines, and to enumerate fields when expanding objects.
///
/// Implementations must be side-effect-free under concurrent access; the
/// session never mutates the loader and may query it from multiple tasks.
pub trait ClassLoader: Send + Sync {
    /// Resolve a source line to its executable position.
    fn line_info_from_line(&self, line: u32, source_path: &str) -> Option<LineInfo>;

    /// Resolve a code position back to its source line.
    fn line_info_from_pc(
        &self,
        pc: u32,
        class_name: &str,
        method_name: &str,
        descriptor: &str,
    ) -> Option<LineInfo>;

    /// Whether `class_name` is `ancestor` or descends from it.
    fn is_instance_of(&self, class_name: &str, ancestor: &str) -> bool;

    /// The class's fields, walking superclasses when `include_inherited`.
    /// `None` when the class is not loadable.
    fn field_list(&self, class_name: &str, include_inherited: bool) -> Option<Vec<FieldInfo>>;
}
