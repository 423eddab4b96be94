//! Architecture contract tests.

mod support;

use support::architecture::{non_export_lines_in_mod_files, production_lines_containing};

#[test]
fn domain_has_no_framework_or_outer_layer_imports() {
    let hits = production_lines_containing(
        "src/domain",
        &[
            "crate::adapter",
            "crate::infrastructure",
            "crate::application",
            "crate::port",
            "tokio::",
            "reqwest::",
            "diesel::",
            "teloxide::",
        ],
    );
    assert!(hits.is_empty(), "found forbidden imports in domain layer: {hits:#?}");
}

#[test]
fn ports_do_not_depend_on_adapters() {
    let hits = production_lines_containing(
        "src/port",
        &["crate::adapter", "crate::infrastructure", "crate::application"],
    );
    assert!(hits.is_empty(), "found outer-layer imports in ports: {hits:#?}");
}

#[test]
fn application_depends_only_on_ports_and_domain() {
    let hits = production_lines_containing(
        "src/application",
        &["crate::adapter", "crate::infrastructure", "reqwest::", "diesel::", "teloxide::"],
    );
    assert!(hits.is_empty(), "found adapter imports in application layer: {hits:#?}");
}

#[test]
fn telegram_stays_behind_its_feature() {
    let hits = production_lines_containing("src", &["teloxide::"]);
    assert!(
        hits.iter()
            .all(|(path, _, _)| path.starts_with("src/adapter/outbound/notifier/telegram/")),
        "teloxide used outside the telegram adapter: {hits:#?}"
    );
}

#[test]
fn mod_rs_is_export_only() {
    let violations = non_export_lines_in_mod_files("src");
    assert!(
        violations.is_empty(),
        "found non-export content in mod.rs files: {violations:#?}"
    );
}
