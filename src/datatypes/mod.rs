mod command;
pub mod descriptor;
mod exception;
mod line_info;
mod stack_frame;
mod status;
mod value;
pub mod wire_string;

pub use command::{Command, RESPONSE_BIT, ResponseCode};
pub use exception::ExceptionInfo;
pub use line_info::{FieldInfo, LineInfo, LocalVar};
pub use stack_frame::StackFrame;
pub use status::Status;
pub use value::{Value, ValueInfo};
