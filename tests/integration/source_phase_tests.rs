//! Tests of the source-text fallback phase: references the compiler erases
//! from byte code, chiefly inlined constant reads.

mod common;

use std::path::Path;

use classreaper::{DeadClassAnalyzer, FilterPolicy};
use common::*;
use tempfile::TempDir;

fn analyze(root: &Path) -> classreaper::AnalysisReport {
    DeadClassAnalyzer::new(FilterPolicy::allow_all(), None)
        .find_dead_classes(root)
        .expect("analysis should succeed")
}

/// A class declaring a string constant; reads of it are inlined by javac,
/// so nothing in byte code points back at the owner.
fn constant_owner(internal_name: &str) -> Vec<u8> {
    ClassFileBuilder::new(internal_name)
        .field("CONSTANT", "Ljava/lang/String;")
        .build()
}

#[test]
fn test_constant_owner_is_dead_without_source() {
    let dir = TempDir::new().unwrap();
    write_class(dir.path(), "com/example/Owner", &constant_owner("com/example/Owner"));
    write_class(dir.path(), "com/example/Reader", &plain_class("com/example/Reader"));

    // No source available: a binary-only scan cannot tell the inlined
    // constant from a literal, so the owner enters the source phase dead.
    let report = analyze(dir.path());

    assert!(report.unused.contains("com.example.Owner"));
}

#[test]
fn test_constant_read_by_fully_qualified_name() {
    let dir = TempDir::new().unwrap();
    write_class(dir.path(), "com/example/other/Owner", &constant_owner("com/example/other/Owner"));
    write_class(dir.path(), "com/example/Reader", &plain_class("com/example/Reader"));
    write_source(
        dir.path(),
        "com/example/Reader",
        r#"
        package com.example;

        public class Reader {
            public String read() {
                return com.example.other.Owner.CONSTANT;
            }
        }
        "#,
    );

    let report = analyze(dir.path());

    assert!(!report.unused.contains("com.example.other.Owner"));
}

#[test]
fn test_constant_read_by_simple_name_in_same_package() {
    let dir = TempDir::new().unwrap();
    write_class(dir.path(), "com/example/Owner", &constant_owner("com/example/Owner"));
    write_class(dir.path(), "com/example/Reader", &plain_class("com/example/Reader"));
    write_source(
        dir.path(),
        "com/example/Reader",
        r#"
        package com.example;

        public class Reader {
            public String read() {
                return Owner.CONSTANT;
            }
        }
        "#,
    );

    let report = analyze(dir.path());

    assert!(!report.unused.contains("com.example.Owner"));
}

#[test]
fn test_constant_read_via_static_import() {
    let dir = TempDir::new().unwrap();
    write_class(dir.path(), "com/example/other/Owner", &constant_owner("com/example/other/Owner"));
    write_class(dir.path(), "com/example/Reader", &plain_class("com/example/Reader"));
    write_source(
        dir.path(),
        "com/example/Reader",
        r#"
        package com.example;

        import static com.example.other.Owner.CONSTANT;

        public class Reader {
            public String read() {
                return CONSTANT;
            }
        }
        "#,
    );

    let report = analyze(dir.path());

    assert!(!report.unused.contains("com.example.other.Owner"));
}

#[test]
fn test_constant_read_by_simple_name_via_wildcard_import() {
    let dir = TempDir::new().unwrap();
    write_class(dir.path(), "com/example/other/Owner", &constant_owner("com/example/other/Owner"));
    write_class(dir.path(), "com/example/Reader", &plain_class("com/example/Reader"));
    write_source(
        dir.path(),
        "com/example/Reader",
        r#"
        package com.example;

        import com.example.other.*;

        public class Reader {
            public String read() {
                return Owner.CONSTANT;
            }
        }
        "#,
    );

    let report = analyze(dir.path());

    assert!(!report.unused.contains("com.example.other.Owner"));
}

#[test]
fn test_direct_import_counts_as_use() {
    let dir = TempDir::new().unwrap();
    write_class(dir.path(), "com/example/other/Imported", &constant_owner("com/example/other/Imported"));
    write_class(dir.path(), "com/example/Reader", &plain_class("com/example/Reader"));
    write_source(
        dir.path(),
        "com/example/Reader",
        r#"
        package com.example;

        import com.example.other.Imported;

        public class Reader {
        }
        "#,
    );

    let report = analyze(dir.path());

    assert!(!report.unused.contains("com.example.other.Imported"));
}

#[test]
fn test_simple_name_in_wrong_package_is_not_a_use() {
    let dir = TempDir::new().unwrap();
    write_class(dir.path(), "com/example/other/Owner", &constant_owner("com/example/other/Owner"));
    write_class(dir.path(), "com/example/Reader", &plain_class("com/example/Reader"));
    // Same simple name, but no import makes "Owner" resolve to the
    // candidate from this unit
    write_source(
        dir.path(),
        "com/example/Reader",
        r#"
        package com.example;

        public class Reader {
            public String read() {
                return Owner.CONSTANT;
            }
        }
        "#,
    );

    let report = analyze(dir.path());

    assert!(report.unused.contains("com.example.other.Owner"));
}

#[test]
fn test_own_constant_is_a_self_reference() {
    let dir = TempDir::new().unwrap();
    write_class(dir.path(), "com/example/Owner", &constant_owner("com/example/Owner"));
    write_source(
        dir.path(),
        "com/example/Owner",
        r#"
        package com.example;

        public class Owner {
            public static final String CONSTANT = "constant";

            public String read() {
                return Owner.CONSTANT;
            }
        }
        "#,
    );

    let report = analyze(dir.path());

    assert!(report.unused.contains("com.example.Owner"));
}

#[test]
fn test_unparseable_source_does_not_abort_the_batch() {
    let dir = TempDir::new().unwrap();
    write_class(dir.path(), "com/example/Owner", &constant_owner("com/example/Owner"));
    write_class(dir.path(), "com/example/Reader", &plain_class("com/example/Reader"));
    write_source(dir.path(), "com/example/Broken", "%% this is not java %%");
    write_source(
        dir.path(),
        "com/example/Reader",
        r#"
        package com.example;

        public class Reader {
            public String read() {
                return Owner.CONSTANT;
            }
        }
        "#,
    );

    let report = analyze(dir.path());

    assert!(!report.unused.contains("com.example.Owner"));
}

#[test]
fn test_source_without_declared_type_is_skipped() {
    let dir = TempDir::new().unwrap();
    write_class(dir.path(), "com/example/Owner", &constant_owner("com/example/Owner"));
    write_source(dir.path(), "com/example/package-info", "package com.example;\n");

    let report = analyze(dir.path());

    assert!(report.unused.contains("com.example.Owner"));
}
