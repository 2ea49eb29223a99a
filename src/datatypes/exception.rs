// ABOUTME: The pending exception reported by READ_EXCP_INFO

/// Type and message of the exception the target stopped on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionInfo {
    /// Slash-form class name of the thrown exception
    pub type_name: String,
    pub message: String,
}
