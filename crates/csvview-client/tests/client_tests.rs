// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use csvview_app::{CellValue, FileId};
use csvview_client::Client;
use std::io::Read;
use std::thread;
use std::time::Duration;
use tiny_http::{Header, Method, Response, Server};

fn json_header() -> Header {
    Header::from_bytes("Content-Type", "application/json").expect("valid content type header")
}

#[test]
fn new_rejects_blank_base_url() {
    let error = Client::new("///", Duration::from_secs(1)).expect_err("blank base url");
    assert!(error.to_string().contains("[server].base_url"));
}

#[test]
fn unreachable_server_error_is_actionable() {
    let client = Client::new("http://127.0.0.1:1", Duration::from_millis(50))
        .expect("client should initialize");

    let error = client
        .fetch_dataset(&FileId::from("abc"), "sales.csv")
        .expect_err("fetch should fail for unreachable endpoint");
    let message = error.to_string();
    assert!(message.contains("cannot reach http://127.0.0.1:1"));
    assert!(message.contains("[server].base_url"));
}

#[test]
fn fetch_dataset_encodes_query_and_parses_rows() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}/", server.server_addr());

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        assert_eq!(request.method(), &Method::Get);
        assert_eq!(
            request.url(),
            "/view-plots?id=f-1&filename=q1+sales%26costs.csv"
        );
        let body = r#"[{"Name":"A","Revenue":100},{"Name":"B","Revenue":250}]"#;
        let response = Response::from_string(body)
            .with_status_code(200)
            .with_header(json_header());
        request.respond(response).expect("response should succeed");
    });

    let client = Client::new(&addr, Duration::from_secs(1))?;
    assert!(!client.base_url().ends_with('/'));
    let data = client.fetch_dataset(&FileId::from("f-1"), "q1 sales&costs.csv")?;
    assert_eq!(data.columns(), ["Name", "Revenue"]);
    assert_eq!(data.rows()[1].get("Revenue"), Some(&CellValue::Number(250.0)));

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn fetch_dataset_surfaces_server_message() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}", server.server_addr());

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        let response = Response::from_string(r#"{"error":"unknown file id"}"#)
            .with_status_code(404)
            .with_header(json_header());
        request.respond(response).expect("response should succeed");
    });

    let client = Client::new(&addr, Duration::from_secs(1))?;
    let error = client
        .fetch_dataset(&FileId::from("missing"), "gone.csv")
        .expect_err("404 should fail");
    assert_eq!(error.to_string(), "server error (404): unknown file id");

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn upload_csv_sends_file_and_id_parts() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}", server.server_addr());

    let handle = thread::spawn(move || {
        let mut request = server.recv().expect("request expected");
        assert_eq!(request.method(), &Method::Post);
        assert_eq!(request.url(), "/upload");

        let content_type = request
            .headers()
            .iter()
            .find(|header| header.field.equiv("Content-Type"))
            .map(|header| header.value.to_string())
            .unwrap_or_default();
        assert!(content_type.starts_with("multipart/form-data"));

        let mut body = String::new();
        request
            .as_reader()
            .read_to_string(&mut body)
            .expect("body should be readable");
        assert!(body.contains("name=\"file\"; filename=\"sales.csv\""));
        assert!(body.contains("Name,Revenue\nA,1\n"));
        assert!(body.contains("name=\"id\""));
        assert!(body.contains("upload-123"));

        request
            .respond(Response::from_string("ok").with_status_code(200))
            .expect("response should succeed");
    });

    let client = Client::new(&addr, Duration::from_secs(1))?;
    client.upload_csv(
        &FileId::from("upload-123"),
        "sales.csv",
        b"Name,Revenue\nA,1\n",
    )?;

    handle.join().expect("server thread should join");
    Ok(())
}
