// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use csvview_app::{DEFAULT_AUTHOR, Dataset, FileId, Upload, UploadForm, UploadId, UploadRequest};
use csvview_client::Client;
use csvview_store::{NewUpload, Store};
use csvview_tui::InternalEvent;
use std::fs;
use std::sync::mpsc::Sender;
use std::thread;
use time::OffsetDateTime;

const DEMO_FILE_NAME: &str = "demo-sales.csv";
const DEMO_SEED: u64 = 42;
const DEMO_ROWS: usize = 8;

pub struct ServiceRuntime<'a> {
    store: &'a Store,
    client: Client,
}

impl<'a> ServiceRuntime<'a> {
    pub fn new(store: &'a Store, client: Client) -> Self {
        Self { store, client }
    }
}

impl csvview_tui::AppRuntime for ServiceRuntime<'_> {
    fn list_uploads(&mut self) -> Result<Vec<Upload>> {
        self.store.list_uploads()
    }

    fn delete_upload(&mut self, upload_id: UploadId) -> Result<()> {
        self.store.delete_upload(upload_id)
    }

    fn fetch_dataset(&mut self, upload: &Upload) -> Result<Dataset> {
        self.client.fetch_dataset(&upload.file_id, &upload.file_name)
    }

    fn spawn_fetch(
        &mut self,
        request_id: u64,
        upload: &Upload,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let client = self.client.clone();
        let file_id = upload.file_id.clone();
        let file_name = upload.file_name.clone();
        thread::Builder::new()
            .name(format!("fetch-{request_id}"))
            .spawn(move || {
                let result = client
                    .fetch_dataset(&file_id, &file_name)
                    .map_err(|error| format!("{error:#}"));
                if let Err(error) = &result {
                    log::warn!("fetch {file_name} failed: {error}");
                }
                // The receiver is gone once the UI has exited.
                let _ = tx.send(InternalEvent::DatasetLoaded { request_id, result });
            })
            .context("spawn dataset fetch thread")?;
        Ok(())
    }
}

/// Serves every upload from one generated dataset instead of the network.
pub struct DemoRuntime<'a> {
    store: &'a Store,
    dataset: Dataset,
}

impl<'a> DemoRuntime<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self {
            store,
            dataset: demo_dataset(),
        }
    }
}

impl csvview_tui::AppRuntime for DemoRuntime<'_> {
    fn list_uploads(&mut self) -> Result<Vec<Upload>> {
        self.store.list_uploads()
    }

    fn delete_upload(&mut self, upload_id: UploadId) -> Result<()> {
        self.store.delete_upload(upload_id)
    }

    fn fetch_dataset(&mut self, _upload: &Upload) -> Result<Dataset> {
        Ok(self.dataset.clone())
    }
}

fn demo_dataset() -> Dataset {
    csvview_testkit::DatasetFaker::new(DEMO_SEED).dataset(DEMO_ROWS)
}

pub fn seed_demo_upload(store: &Store) -> Result<UploadId> {
    let csv = csvview_testkit::dataset_to_csv(&demo_dataset());
    store.insert_upload(&NewUpload {
        file_id: FileId::generate(),
        file_name: DEMO_FILE_NAME.to_owned(),
        author: DEFAULT_AUTHOR.to_owned(),
        description: "Generated sales figures".to_owned(),
        data: csv.into_bytes(),
        uploaded_at: OffsetDateTime::now_utc(),
    })
}

/// Records the upload locally, then sends it to the CSV service.
///
/// A failed transfer leaves the local record in place and returns the error.
pub fn upload_file(store: &Store, client: &Client, form: &UploadForm) -> Result<Upload> {
    let request = form.validate()?;
    let UploadRequest {
        file_id,
        path,
        file_name,
        author,
        description,
    } = request;

    let data = fs::read(&path).with_context(|| format!("read {}", path.display()))?;
    let upload_id = store
        .insert_upload(&NewUpload {
            file_id: file_id.clone(),
            file_name: file_name.clone(),
            author,
            description,
            data: data.clone(),
            uploaded_at: OffsetDateTime::now_utc(),
        })
        .with_context(|| format!("record upload of {file_name}"))?;

    client
        .upload_csv(&file_id, &file_name, &data)
        .map_err(|error| {
            anyhow!(
                "{file_name} was recorded locally as {file_id} but the transfer failed: {error:#}"
            )
        })?;

    log::info!("uploaded {file_name} as {file_id}");
    store.get_upload(upload_id)
}
