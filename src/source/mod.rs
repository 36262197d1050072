mod java;

pub use java::{ImportStatement, JavaUnitReader, SourceUnit};
