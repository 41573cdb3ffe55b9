#![cfg(unix)]

mod common;

use std::fs;
use std::sync::Arc;

use common::{FakeXjc, SIMPLE_BINDING, SIMPLE_SCHEMA, StubServer, count_entries, test_materializer, write_file};
use tempfile::TempDir;
use xjc_driver::{
    CollectingSink, Command, DEFAULT_ENTRY_POINT, ExitStatusKind, Invocation, PostProcessing,
    ResourceLocator, SUPPRESS_WARNINGS, Severity, XjcCompiler, XjcError,
};

struct Workspace {
    _root: TempDir,
    sources: std::path::PathBuf,
    scratch: std::path::PathBuf,
    out: std::path::PathBuf,
}

fn workspace() -> Workspace {
    let root = TempDir::new().unwrap();
    let sources = root.path().join("src");
    let scratch = root.path().join("scratch");
    let out = root.path().join("out");
    fs::create_dir_all(&sources).unwrap();
    fs::create_dir_all(&scratch).unwrap();
    Workspace {
        sources,
        scratch,
        out,
        _root: root,
    }
}

fn compiler(ws: &Workspace, fake: &FakeXjc, sink: &CollectingSink) -> XjcCompiler {
    XjcCompiler::new(test_materializer(&ws.scratch))
        .with_invocation(Invocation::Subprocess(fake.launcher()))
        .with_sink(Arc::new(sink.clone()))
}

fn remote(url: String) -> ResourceLocator {
    url.parse().unwrap()
}

#[tokio::test]
async fn test_subprocess_receives_translated_arguments() {
    let ws = workspace();
    let fake = FakeXjc::new(&ws.sources, 0);
    let sink = CollectingSink::new();
    let schema_a = write_file(&ws.sources, "a.xsd", SIMPLE_SCHEMA);
    let schema_b = write_file(&ws.sources, "b.xsd", SIMPLE_SCHEMA);
    let binding = write_file(&ws.sources, "bindings.xjb", SIMPLE_BINDING);

    let command = Command::new()
        .with_schema(schema_a.clone())
        .with_schema(schema_b.clone())
        .with_binding(binding.clone())
        .with_dest_dir(&ws.out);

    let report = compiler(&ws, &fake, &sink).compile(&command).await.unwrap();

    let recorded = fake.recorded_args();
    assert!(recorded.contains(&"-Dcom.sun.tools.xjc.XJCFacade.nohack=true".to_string()));
    assert_eq!(
        fake.tool_args(),
        vec![
            DEFAULT_ENTRY_POINT.to_string(),
            "-Xannotate".to_string(),
            "-enableIntrospection".to_string(),
            schema_a.display().to_string(),
            schema_b.display().to_string(),
            "-b".to_string(),
            binding.display().to_string(),
            "-d".to_string(),
            ws.out.display().to_string(),
        ]
    );

    assert_eq!(report.schemas, 2);
    assert_eq!(report.tool.map(|t| t.output_lines), Some(2));
    let messages = sink.messages();
    assert!(messages.contains(&(Severity::Warning, "generating code".to_string())));
    assert!(messages.contains(&(Severity::Info, "parsing a schema...".to_string())));
}

#[tokio::test]
async fn test_generated_sources_are_annotated() {
    let ws = workspace();
    let fake = FakeXjc::new(&ws.sources, 0);
    let schema = write_file(&ws.sources, "a.xsd", SIMPLE_SCHEMA);
    let command = Command::new().with_schema(schema).with_dest_dir(&ws.out);

    let report = compiler(&ws, &fake, &CollectingSink::new())
        .compile(&command)
        .await
        .unwrap();

    match report.post_processing {
        PostProcessing::Completed(stats) => assert_eq!(stats.inserted, 1),
        other => panic!("Expected completed annotation pass, got {:?}", other),
    }
    let generated = fs::read_to_string(ws.out.join("com/example/Order.java")).unwrap();
    assert_eq!(
        generated,
        format!("package com.example;\n\n{}\npublic class Order {{\n}}\n", SUPPRESS_WARNINGS)
    );
}

#[tokio::test]
async fn test_annotation_skipped_when_disabled() {
    let ws = workspace();
    let fake = FakeXjc::new(&ws.sources, 0);
    let schema = write_file(&ws.sources, "a.xsd", SIMPLE_SCHEMA);
    let command = Command {
        suppress_warnings: false,
        ..Command::new()
    }
    .with_schema(schema)
    .with_dest_dir(&ws.out);

    let report = compiler(&ws, &fake, &CollectingSink::new())
        .compile(&command)
        .await
        .unwrap();

    assert_eq!(report.post_processing, PostProcessing::Disabled);
    let generated = fs::read_to_string(ws.out.join("com/example/Order.java")).unwrap();
    assert!(!generated.contains(SUPPRESS_WARNINGS));
}

#[tokio::test]
async fn test_remote_schema_is_downloaded_and_removed() {
    let ws = workspace();
    let fake = FakeXjc::new(&ws.sources, 0);
    let server = StubServer::start(vec![("/schemas/order.xsd", SIMPLE_SCHEMA)]).await;
    let command = Command::new()
        .with_schema(remote(server.url("/schemas/order.xsd")))
        .with_dest_dir(&ws.out);

    let report = compiler(&ws, &fake, &CollectingSink::new())
        .compile(&command)
        .await
        .unwrap();

    // the tool saw the downloaded content through a local temp file
    assert_eq!(fake.seen_schemas(), SIMPLE_SCHEMA);
    let schema_arg = fake
        .tool_args()
        .into_iter()
        .find(|a| a.ends_with(".xsd"))
        .unwrap();
    let file_name = std::path::Path::new(&schema_arg)
        .file_name()
        .unwrap()
        .to_string_lossy()
        .into_owned();
    assert!(file_name.starts_with("order-"));

    assert_eq!(report.temp_files_removed, 1);
    assert_eq!(count_entries(&ws.scratch), 0);
}

#[tokio::test]
async fn test_failed_invocation_reports_command_line_and_cleans_up() {
    let ws = workspace();
    let fake = FakeXjc::new(&ws.sources, 1);
    let server = StubServer::start(vec![("/order.xsd", SIMPLE_SCHEMA)]).await;
    let command = Command::new()
        .with_schema(remote(server.url("/order.xsd")))
        .with_dest_dir(&ws.out);

    let result = compiler(&ws, &fake, &CollectingSink::new())
        .compile(&command)
        .await;

    match result {
        Err(XjcError::Invocation { status, command_line }) => {
            assert_eq!(status, ExitStatusKind::Code(1));
            assert!(command_line.starts_with("/bin/sh "));
            assert!(command_line.contains(DEFAULT_ENTRY_POINT));
            assert!(command_line.ends_with(&format!("-d {}", ws.out.display())));
        }
        other => panic!("Expected invocation error, got {:?}", other),
    }
    assert_eq!(count_entries(&ws.scratch), 0);

    // output written before the failure is left unannotated
    let generated = fs::read_to_string(ws.out.join("com/example/Order.java")).unwrap();
    assert!(!generated.contains(SUPPRESS_WARNINGS));
}

#[tokio::test]
async fn test_uncreatable_destination_spawns_nothing() {
    let ws = workspace();
    let fake = FakeXjc::new(&ws.sources, 0);
    let server = StubServer::start(vec![("/order.xsd", SIMPLE_SCHEMA)]).await;
    let blocker = write_file(&ws.sources, "blocker", "plain file");

    let command = Command::new()
        .with_schema(remote(server.url("/order.xsd")))
        .with_dest_dir(blocker.join("out"));

    let result = compiler(&ws, &fake, &CollectingSink::new())
        .compile(&command)
        .await;

    assert!(matches!(result, Err(XjcError::Config(_))));
    assert!(!fake.was_run());
    assert_eq!(server.hits(), 0);
    assert_eq!(count_entries(&ws.scratch), 0);
}

#[tokio::test]
async fn test_missing_remote_resource_aborts_before_invocation() {
    let ws = workspace();
    let fake = FakeXjc::new(&ws.sources, 0);
    let server = StubServer::start(vec![("/order.xsd", SIMPLE_SCHEMA)]).await;
    let command = Command::new()
        .with_schema(remote(server.url("/order.xsd")))
        .with_binding(remote(server.url("/missing.xjb")))
        .with_dest_dir(&ws.out);

    let result = compiler(&ws, &fake, &CollectingSink::new())
        .compile(&command)
        .await;

    match result {
        Err(XjcError::HttpStatus { status, .. }) => assert_eq!(status, 404),
        other => panic!("Expected HTTP status error, got {:?}", other),
    }
    assert!(!fake.was_run());
    assert_eq!(count_entries(&ws.scratch), 0);
}

#[tokio::test]
async fn test_empty_schema_set_is_noop() {
    let ws = workspace();
    let fake = FakeXjc::new(&ws.sources, 0);

    let report = compiler(&ws, &fake, &CollectingSink::new())
        .compile(&Command::new().with_dest_dir(&ws.out))
        .await
        .unwrap();

    assert!(report.is_skipped());
    assert!(!fake.was_run());
    assert!(!ws.out.exists());
}

#[tokio::test]
async fn test_catalog_enables_ignore_missing_property() {
    let ws = workspace();
    let fake = FakeXjc::new(&ws.sources, 0);
    let schema = write_file(&ws.sources, "a.xsd", SIMPLE_SCHEMA);
    let catalog = write_file(&ws.sources, "catalog.cat", "");
    let command = Command {
        catalog: Some(catalog.clone()),
        ..Command::new()
    }
    .with_schema(schema)
    .with_dest_dir(&ws.out);

    compiler(&ws, &fake, &CollectingSink::new())
        .compile(&command)
        .await
        .unwrap();

    let recorded = fake.recorded_args();
    assert!(recorded.contains(&"-Dxml.catalog.ignoreMissing=true".to_string()));
    let position = recorded.iter().position(|a| a == "-catalog").unwrap();
    assert_eq!(recorded[position + 1], catalog.display().to_string());
}
