#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::wildcard_imports,
    clippy::indexing_slicing
)]
//! Integration tests for template rendering.
//!
//! Covers the render contract (expressions, assignment, isolation between
//! renders) and the manifest-level helper that resolves templates below the
//! configured `template_root` on the real filesystem.

mod common;

use common::{Harness, TestDir};
use marionette::config::Configuration;
use marionette::manifest::{Manifest, ManifestError, ManifestTypeBuilder};
use marionette::operations::SystemFileSystemOps;
use marionette::resources::Attributes;
use marionette::template::{Bindings, Template, TemplateError, render};
use serde_json::{Value, json};

fn bindings(value: Value) -> Bindings {
    value.as_object().cloned().unwrap_or_default()
}

#[test]
fn arithmetic_without_context() {
    assert_eq!(
        render("1 plus 2 is <%= 1 + 2 %>", &Bindings::new()).unwrap(),
        "1 plus 2 is 3"
    );
}

#[test]
fn assignment_overrides_context_for_rest_of_render() {
    let out = render(
        "<%= var %>\n<% var = 5 %>\n<%= var %>\n",
        &bindings(json!({"var": 4})),
    )
    .unwrap();
    assert_eq!(out, "4\n\n5\n");
}

#[test]
fn renders_do_not_share_bindings() {
    let context = bindings(json!({"var": 4}));
    render("<% var = 5 %><% other = 1 %>", &context).unwrap();
    assert_eq!(render("<%= var %>", &context).unwrap(), "4");
    let err = render("<%= other %>", &Bindings::new()).unwrap_err();
    assert!(matches!(err, TemplateError::UndefinedVariable { ref name } if name == "other"));
}

#[test]
fn template_files_are_isolated() {
    let dir = TestDir::new();
    let assigns = dir.write("assigns.erb", "<% secret = 42 %><%= secret %>");
    let reads = dir.write("reads.erb", "<%= secret %>");
    let fs = SystemFileSystemOps;
    assert_eq!(Template::new(&assigns, Bindings::new()).render(&fs).unwrap(), "42");
    assert!(matches!(
        Template::new(&reads, Bindings::new()).render(&fs),
        Err(TemplateError::UndefinedVariable { .. })
    ));
}

#[test]
fn missing_template_file_is_an_io_error() {
    let dir = TestDir::new();
    let err = Template::new(dir.path().join("nope.erb"), Bindings::new())
        .render(&SystemFileSystemOps)
        .unwrap_err();
    assert!(matches!(err, TemplateError::Io { .. }));
}

#[test]
fn manifest_template_uses_template_root() {
    let dir = TestDir::new();
    dir.write(
        "templates/nginx.conf.erb",
        "<%# generated -%>\nworker_processes <%= nginx.workers %>;\nlisten <%= port + 1 %>;\n",
    );
    let t = ManifestTypeBuilder::new("Web")
        .configure(
            Configuration::from_value(json!({
                "template_root": dir.path().join("templates").display().to_string(),
                "nginx": {"workers": 4},
            }))
            .unwrap(),
        )
        .build();
    let h = Harness::new();
    let m = Manifest::new(&t, &h.runtime);
    let mut context = m.configuration().as_map().clone();
    context.insert("port".to_string(), json!(8079));
    assert_eq!(
        m.template("nginx.conf.erb", context).unwrap(),
        "worker_processes 4;\nlisten 8080;\n"
    );
}

#[test]
fn manifest_template_without_root_fails_even_inside_execute() {
    let t = ManifestTypeBuilder::new("NoRoot")
        .recipe("motd")
        .handler("motd", |m, _| {
            let content = m.template("motd.erb", Bindings::new())?;
            m.file("/etc/motd", Attributes::new()).set("content", content);
            Ok(())
        })
        .build();
    let h = Harness::new();
    let mut m = Manifest::new(&t, &h.runtime);
    let err = m.execute_strict().unwrap_err();
    assert!(matches!(
        err,
        ManifestError::RecipeFailed { ref source, .. }
            if matches!(source.downcast_ref::<ManifestError>(), Some(ManifestError::TemplateRootMissing))
    ));
    assert!(h.backend.calls().is_empty());
}
