//! Binary class artifact reader.
//!
//! Decodes the structural shape of one compiled `.class` file — declared
//! name, supertype, interfaces, fields, methods, annotations, bytecode —
//! without executing or verifying anything. The walk is version-tolerant:
//! any class file whose layout can be traversed is accepted.

mod descriptor;
mod reader;
mod refs;

pub use descriptor::{descriptor_class, external_name, method_descriptor, MethodDescriptor};
pub use reader::{
    AnnotationInfo, BootstrapMethod, ClassFile, CodeBlock, ElementValue, FieldInfo, MethodInfo,
};
pub use refs::{class_references, ClassReference};

use thiserror::Error;

/// Failure while decoding a single class artifact. Recovered per-file by
/// the scanners; never aborts a batch.
#[derive(Debug, Error)]
pub enum ClassReadError {
    #[error("unexpected end of class file")]
    UnexpectedEof,
    #[error("invalid class file magic header")]
    InvalidMagic,
    #[error("unsupported constant pool tag {tag}")]
    UnsupportedConstant { tag: u8 },
    #[error("invalid constant pool index {index}")]
    InvalidConstantIndex { index: u16 },
    #[error("invalid UTF-8 string in constant pool: {0}")]
    Utf8Decode(#[from] std::string::FromUtf8Error),
    #[error("malformed descriptor: {0}")]
    InvalidDescriptor(String),
    #[error("malformed annotation attribute: {0}")]
    InvalidAnnotation(String),
    #[error("unknown opcode {opcode:#04x} at bytecode offset {offset}")]
    UnknownOpcode { opcode: u8, offset: usize },
    #[error("invalid bootstrap method index {index}")]
    InvalidBootstrapIndex { index: u16 },
}
