// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use csvview_app::{CellValue, Dataset, FileId, Record};
use reqwest::StatusCode;
use reqwest::blocking::Client as HttpClient;
use reqwest::blocking::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    timeout: Duration,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            bail!("server.base_url must not be empty; set [server].base_url in the config file");
        }
        Url::parse(&base_url).with_context(|| {
            format!("server.base_url {base_url:?} is not a valid URL; use e.g. http://localhost:8000")
        })?;

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            timeout,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// `POST {base}/upload` with multipart parts `file` and `id`.
    pub fn upload_csv(&self, file_id: &FileId, file_name: &str, data: &[u8]) -> Result<()> {
        let file = Part::bytes(data.to_vec())
            .file_name(file_name.to_owned())
            .mime_str("text/csv")
            .context("build multipart file part")?;
        let form = Form::new()
            .part("file", file)
            .text("id", file_id.as_str().to_owned());

        log::debug!("uploading {file_name} ({} bytes) as {file_id}", data.len());
        let response = self
            .http
            .post(format!("{}/upload", self.base_url))
            .multipart(form)
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }
        Ok(())
    }

    pub fn view_plots_url(&self, file_id: &FileId, file_name: &str) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/view-plots", self.base_url))
            .with_context(|| format!("build view-plots URL from {}", self.base_url))?;
        url.query_pairs_mut()
            .append_pair("id", file_id.as_str())
            .append_pair("filename", file_name);
        Ok(url)
    }

    /// `GET {base}/view-plots?id=&filename=`, parsed into a dataset.
    pub fn fetch_dataset(&self, file_id: &FileId, file_name: &str) -> Result<Dataset> {
        let url = self.view_plots_url(file_id, file_name)?;
        let response = self
            .http
            .get(url)
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }

        let body = response.text().context("read view-plots response")?;
        let dataset = parse_dataset_json(&body)
            .with_context(|| format!("decode data for {file_name}"))?;
        log::debug!(
            "fetched {file_name}: {} rows x {} columns",
            dataset.len(),
            dataset.columns().len()
        );
        Ok(dataset)
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DatasetResponse {
    Rows(Vec<Map<String, Value>>),
    Table {
        #[serde(default)]
        columns: Option<Vec<String>>,
        data: Vec<Map<String, Value>>,
    },
}

/// Accepts either an array of row objects or `{ "columns": [...], "data": [...] }`.
pub fn parse_dataset_json(body: &str) -> Result<Dataset> {
    let parsed: DatasetResponse = serde_json::from_str(body)
        .context("expected a JSON array of rows or an object with `data`")?;

    let (columns, objects) = match parsed {
        DatasetResponse::Rows(objects) => (None, objects),
        DatasetResponse::Table { columns, data } => (columns, data),
    };

    let columns = columns.unwrap_or_else(|| {
        objects
            .first()
            .map(|object| object.keys().cloned().collect())
            .unwrap_or_default()
    });

    let rows = objects
        .into_iter()
        .map(|object| {
            Record::from_pairs(
                object
                    .into_iter()
                    .map(|(key, value)| (key, json_cell(value))),
            )
        })
        .collect();
    Ok(Dataset::new(columns, rows))
}

fn json_cell(value: Value) -> CellValue {
    match value {
        Value::Number(number) => match number.as_f64() {
            Some(float) => CellValue::Number(float),
            None => CellValue::Text(number.to_string()),
        },
        Value::String(text) => CellValue::Text(text),
        Value::Bool(flag) => CellValue::Text(flag.to_string()),
        Value::Null => CellValue::Text(String::new()),
        nested @ (Value::Array(_) | Value::Object(_)) => CellValue::Text(nested.to_string()),
    }
}

fn connection_error(base_url: &str, error: reqwest::Error) -> anyhow::Error {
    anyhow!(
        "cannot reach {} -- check [server].base_url and that the CSV service is running ({})",
        base_url,
        error
    )
}

fn clean_error_response(status: StatusCode, body: &str) -> anyhow::Error {
    if let Ok(parsed) = serde_json::from_str::<ErrorEnvelope>(body)
        && let Some(message) = parsed.error.or(parsed.message).or(parsed.detail)
        && !message.is_empty()
    {
        return anyhow!("server error ({}): {}", status.as_u16(), message);
    }

    if body.len() < 100 && !body.contains('{') && !body.trim().is_empty() {
        return anyhow!("server error ({}): {}", status.as_u16(), body.trim());
    }

    anyhow!("server returned {}", status.as_u16())
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<String>,
    message: Option<String>,
    detail: Option<String>,
}
