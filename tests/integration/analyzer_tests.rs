//! End-to-end tests of the structural analysis pipeline against synthetic
//! compiled classes.

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

#[test]
fn test_unreferenced_class_is_reported_dead() {
    let dir = TempDir::new().unwrap();
    write_class(dir.path(), "com/example/DeadClass", &plain_class("com/example/DeadClass"));

    let report = analyze(dir.path());

    assert_eq!(report.candidate_count, 1);
    assert!(report.unused.contains("com.example.DeadClass"));
}

#[test]
fn test_static_method_call_counts_as_use() {
    let dir = TempDir::new().unwrap();
    write_class(dir.path(), "com/example/Used", &plain_class("com/example/Used"));
    write_class(
        dir.path(),
        "com/example/User",
        &ClassFileBuilder::new("com/example/User")
            .method_with_code("go", "()V", |pool| call_static(pool, "com/example/Used"))
            .build(),
    );

    let report = analyze(dir.path());

    assert!(!report.unused.contains("com.example.Used"));
    // Nothing references the caller itself
    assert!(report.unused.contains("com.example.User"));
}

#[test]
fn test_instantiation_counts_as_use() {
    let dir = TempDir::new().unwrap();
    write_class(dir.path(), "com/example/Used", &plain_class("com/example/Used"));
    write_class(
        dir.path(),
        "com/example/User",
        &ClassFileBuilder::new("com/example/User")
            .method_with_code("go", "()V", |pool| instantiate(pool, "com/example/Used"))
            .build(),
    );

    let report = analyze(dir.path());

    assert!(!report.unused.contains("com.example.Used"));
}

#[test]
fn test_extension_counts_as_use() {
    let dir = TempDir::new().unwrap();
    write_class(dir.path(), "com/example/Base", &plain_class("com/example/Base"));
    write_class(
        dir.path(),
        "com/example/Sub",
        &ClassFileBuilder::extending("com/example/Sub", "com/example/Base").build(),
    );

    let report = analyze(dir.path());

    assert!(!report.unused.contains("com.example.Base"));
    assert!(report.unused.contains("com.example.Sub"));
}

#[test]
fn test_interface_implementation_counts_as_use() {
    let dir = TempDir::new().unwrap();
    write_class(dir.path(), "com/example/Contract", &plain_class("com/example/Contract"));
    write_class(
        dir.path(),
        "com/example/Impl",
        &ClassFileBuilder::new("com/example/Impl")
            .implements("com/example/Contract")
            .build(),
    );

    let report = analyze(dir.path());

    assert!(!report.unused.contains("com.example.Contract"));
}

#[test]
fn test_method_annotation_counts_as_use() {
    let dir = TempDir::new().unwrap();
    write_class(dir.path(), "com/example/Marker", &plain_class("com/example/Marker"));
    write_class(
        dir.path(),
        "com/example/User",
        &ClassFileBuilder::new("com/example/User")
            .annotated_method("go", "()V", "Lcom/example/Marker;")
            .build(),
    );

    let report = analyze(dir.path());

    assert!(!report.unused.contains("com.example.Marker"));
}

#[test]
fn test_declared_signature_types_count_as_use() {
    let dir = TempDir::new().unwrap();
    write_class(dir.path(), "com/example/Param", &plain_class("com/example/Param"));
    write_class(dir.path(), "com/example/Ret", &plain_class("com/example/Ret"));
    write_class(
        dir.path(),
        "com/example/User",
        &ClassFileBuilder::new("com/example/User")
            .method("transform", "(Lcom/example/Param;)Lcom/example/Ret;")
            .build(),
    );

    let report = analyze(dir.path());

    assert!(!report.unused.contains("com.example.Param"));
    assert!(!report.unused.contains("com.example.Ret"));
}

#[test]
fn test_array_parameter_unwraps_to_element_class() {
    let dir = TempDir::new().unwrap();
    write_class(dir.path(), "com/example/Element", &plain_class("com/example/Element"));
    write_class(
        dir.path(),
        "com/example/User",
        &ClassFileBuilder::new("com/example/User")
            .method("consume", "([[Lcom/example/Element;)V")
            .build(),
    );

    let report = analyze(dir.path());

    assert!(!report.unused.contains("com.example.Element"));
}

#[test]
fn test_field_type_counts_as_use() {
    let dir = TempDir::new().unwrap();
    write_class(dir.path(), "com/example/Held", &plain_class("com/example/Held"));
    write_class(
        dir.path(),
        "com/example/Holder",
        &ClassFileBuilder::new("com/example/Holder")
            .field("held", "Lcom/example/Held;")
            .build(),
    );

    let report = analyze(dir.path());

    assert!(!report.unused.contains("com.example.Held"));
}

#[test]
fn test_field_access_registers_the_field_type() {
    let dir = TempDir::new().unwrap();
    write_class(dir.path(), "com/example/Held", &plain_class("com/example/Held"));
    write_class(dir.path(), "com/example/Config", &plain_class("com/example/Config"));
    write_class(
        dir.path(),
        "com/example/Reader",
        &ClassFileBuilder::new("com/example/Reader")
            .method_with_code("go", "()V", |pool| {
                read_static_field(pool, "com/example/Config", "VALUE", "Lcom/example/Held;")
            })
            .build(),
    );

    let report = analyze(dir.path());

    // Field access registers the field's declared type; the owner is only
    // caught when the constant is not inlined (or via the source phase)
    assert!(!report.unused.contains("com.example.Held"));
}

#[test]
fn test_self_reference_is_not_a_use() {
    let dir = TempDir::new().unwrap();
    // A class whose only inbound reference is its own recursive call
    write_class(
        dir.path(),
        "com/example/Recursive",
        &ClassFileBuilder::new("com/example/Recursive")
            .method_with_code("run", "()V", |pool| call_static(pool, "com/example/Recursive"))
            .build(),
    );

    let report = analyze(dir.path());

    assert!(report.unused.contains("com.example.Recursive"));
}

#[test]
fn test_anonymous_class_is_never_a_candidate() {
    let dir = TempDir::new().unwrap();
    write_class(
        dir.path(),
        "com/example/Outer$1",
        &ClassFileBuilder::new("com/example/Outer$1").anonymous().build(),
    );
    write_class(dir.path(), "com/example/Outer", &plain_class("com/example/Outer"));

    let report = analyze(dir.path());

    assert_eq!(report.candidate_count, 1);
    assert!(!report.unused.iter().any(|name| name.contains("Outer.1")));
}

#[test]
fn test_exempted_class_is_never_reported_dead() {
    let dir = TempDir::new().unwrap();
    write_class(dir.path(), "com/example/api/Surface", &plain_class("com/example/api/Surface"));
    write_class(dir.path(), "com/example/Inner", &plain_class("com/example/Inner"));

    let policy = FilterPolicy::new(&[], &[], &["com.example.api.*".to_string()]).unwrap();
    let report = DeadClassAnalyzer::new(policy, None)
        .find_dead_classes(dir.path())
        .unwrap();

    assert_eq!(report.candidate_count, 1);
    assert!(!report.unused.contains("com.example.api.Surface"));
    assert!(report.unused.contains("com.example.Inner"));
}

#[test]
fn test_exempted_class_still_acts_as_reference_source() {
    let dir = TempDir::new().unwrap();
    write_class(dir.path(), "com/example/Used", &plain_class("com/example/Used"));
    write_class(
        dir.path(),
        "com/example/api/Entry",
        &ClassFileBuilder::new("com/example/api/Entry")
            .method_with_code("go", "()V", |pool| call_static(pool, "com/example/Used"))
            .build(),
    );

    let policy = FilterPolicy::new(&[], &[], &["com.example.api.*".to_string()]).unwrap();
    let report = DeadClassAnalyzer::new(policy, None)
        .find_dead_classes(dir.path())
        .unwrap();

    assert!(!report.unused.contains("com.example.Used"));
}

#[test]
fn test_excluded_class_still_acts_as_reference_source() {
    let dir = TempDir::new().unwrap();
    write_class(dir.path(), "com/example/Used", &plain_class("com/example/Used"));
    write_class(
        dir.path(),
        "com/example/generated/Caller",
        &ClassFileBuilder::new("com/example/generated/Caller")
            .method_with_code("go", "()V", |pool| call_static(pool, "com/example/Used"))
            .build(),
    );

    let policy = FilterPolicy::new(&[], &["com.example.generated.*".to_string()], &[]).unwrap();
    let report = DeadClassAnalyzer::new(policy, None)
        .find_dead_classes(dir.path())
        .unwrap();

    assert!(!report.unused.contains("com.example.Used"));
    assert!(!report.unused.contains("com.example.generated.Caller"));
}

#[test]
fn test_unused_set_is_subset_of_candidates() {
    let dir = TempDir::new().unwrap();
    write_class(dir.path(), "com/example/A", &plain_class("com/example/A"));
    write_class(dir.path(), "com/example/B", &plain_class("com/example/B"));
    write_class(
        dir.path(),
        "com/example/C",
        &ClassFileBuilder::new("com/example/C")
            .method_with_code("go", "()V", |pool| call_static(pool, "com/example/A"))
            .build(),
    );

    let report = analyze(dir.path());

    assert!(report.unused.len() <= report.candidate_count);
}

#[test]
fn test_malformed_class_file_does_not_abort_the_batch() {
    let dir = TempDir::new().unwrap();
    write_class(dir.path(), "com/example/Broken", b"\xCA\xFE\xBA\xBE\x00\x00");
    write_class(dir.path(), "com/example/Garbage", b"not a class file at all");
    write_class(dir.path(), "com/example/Fine", &plain_class("com/example/Fine"));

    let report = analyze(dir.path());

    assert_eq!(report.candidate_count, 1);
    assert!(report.unused.contains("com.example.Fine"));
}

#[test]
fn test_invalid_root_fails_fast() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("not-a-directory");
    std::fs::write(&file, b"x").unwrap();

    let result = DeadClassAnalyzer::new(FilterPolicy::allow_all(), None).find_dead_classes(&file);

    assert!(result.is_err());
}

#[test]
fn test_analysis_is_idempotent() {
    let dir = TempDir::new().unwrap();
    write_class(dir.path(), "com/example/Dead", &plain_class("com/example/Dead"));
    write_class(dir.path(), "com/example/Used", &plain_class("com/example/Used"));
    write_class(
        dir.path(),
        "com/example/User",
        &ClassFileBuilder::new("com/example/User")
            .method_with_code("go", "()V", |pool| call_static(pool, "com/example/Used"))
            .build(),
    );

    let first = analyze(dir.path());
    let second = analyze(dir.path());

    assert_eq!(first.candidate_count, second.candidate_count);
    assert_eq!(first.unused, second.unused);
}

// The full scenario from the reference fixtures: D drives A structurally
// and C through a constant, B is touched by nothing.
#[test]
fn test_end_to_end_candidate_pool() {
    let dir = TempDir::new().unwrap();
    write_class(dir.path(), "com/example/A", &plain_class("com/example/A"));
    write_class(dir.path(), "com/example/B", &plain_class("com/example/B"));
    write_class(
        dir.path(),
        "com/example/C",
        &ClassFileBuilder::new("com/example/C")
            .field("CONSTANT", "Ljava/lang/String;")
            .build(),
    );
    write_class(
        dir.path(),
        "com/example/D",
        &ClassFileBuilder::new("com/example/D")
            .method_with_code("go", "()V", |pool| call_static(pool, "com/example/A"))
            .build(),
    );
    write_source(
        dir.path(),
        "com/example/D",
        r#"
        package com.example;

        import static com.example.C.CONSTANT;

        public class D {
            public void go() {
                A.run();
            }

            public String constant() {
                return CONSTANT;
            }
        }
        "#,
    );

    // D is the audit entry point, exempt from reporting
    let policy = FilterPolicy::new(&[], &[], &["com.example.D".to_string()]).unwrap();
    let report = DeadClassAnalyzer::new(policy, None)
        .find_dead_classes(dir.path())
        .unwrap();

    assert_eq!(report.candidate_count, 3);
    assert_eq!(report.sorted_unused(), vec!["com.example.B"]);
}
