//! classreaper - Find classes with no remaining references in compiled JVM
//! projects
//!
//! This library determines which classes in a compiled program are never
//! referenced anywhere else in that program's class files or source text,
//! making them candidates for removal as dead code.
//!
//! # Architecture
//!
//! The analysis pipeline consists of:
//! 1. **Artifact Discovery** - Find all `.class` and `.java` files
//! 2. **Candidate Discovery** - Enumerate analyzable class symbols
//! 3. **Structural Scan** - Walk byte code for every reference visible in
//!    compiled form (signatures, instructions, annotations, dynamic calls)
//! 4. **Source Scan** - Resolve references the compiler erases, chiefly
//!    inlined constant reads, from parsed Java source
//! 5. **Reporting** - Output the surviving candidates

pub mod analysis;
pub mod classfile;
pub mod config;
pub mod discovery;
pub mod filter;
pub mod report;
pub mod source;

pub use analysis::{AnalysisReport, DeadClassAnalyzer, UseConsumer};
pub use classfile::{ClassFile, ClassReadError};
pub use config::Config;
pub use discovery::{Artifact, ArtifactFinder, ArtifactKind};
pub use filter::{FilterPolicy, PatternError};
pub use report::{ReportFormat, Reporter};
pub use source::{JavaUnitReader, SourceUnit};
