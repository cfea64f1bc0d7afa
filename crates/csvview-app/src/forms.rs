// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::fs;
use std::path::{Path, PathBuf};

use crate::ids::FileId;

pub const DEFAULT_AUTHOR: &str = "Unknown";
pub const DEFAULT_DESCRIPTION: &str = "No Description";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadFormError {
    MissingFile,
    NotCsv(PathBuf),
}

impl std::fmt::Display for UploadFormError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingFile => f.write_str("Please choose a CSV file."),
            Self::NotCsv(path) => write!(
                f,
                "Please choose a CSV file. {} does not end in .csv",
                path.display()
            ),
        }
    }
}

impl std::error::Error for UploadFormError {}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UploadForm {
    pub path: Option<PathBuf>,
    pub author: String,
    pub description: String,
}

/// Upload request after validation and defaulting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub file_id: FileId,
    pub path: PathBuf,
    pub file_name: String,
    pub author: String,
    pub description: String,
}

impl UploadForm {
    pub fn validate(&self) -> Result<UploadRequest, UploadFormError> {
        let path = self.path.as_deref().ok_or(UploadFormError::MissingFile)?;
        if !is_regular_file(path) {
            return Err(UploadFormError::MissingFile);
        }
        if !has_csv_extension(path) {
            return Err(UploadFormError::NotCsv(path.to_path_buf()));
        }

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or(UploadFormError::MissingFile)?;

        Ok(UploadRequest {
            file_id: FileId::generate(),
            path: path.to_path_buf(),
            file_name,
            author: or_default(&self.author, DEFAULT_AUTHOR),
            description: or_default(&self.description, DEFAULT_DESCRIPTION),
        })
    }
}

fn is_regular_file(path: &Path) -> bool {
    fs::metadata(path).is_ok_and(|metadata| metadata.is_file())
}

fn has_csv_extension(path: &Path) -> bool {
    path.extension()
        .is_some_and(|extension| extension.eq_ignore_ascii_case("csv"))
}

fn or_default(value: &str, default: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        default.to_owned()
    } else {
        trimmed.to_owned()
    }
}
