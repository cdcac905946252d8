use crate::tree::Tree;
use crate::tree::xml::LoadError;
use relative_path::RelativePath;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid data directory: {0}")]
    InvalidDataDir(String),
    #[error("Malformed article: {0}")]
    Load(#[from] LoadError),
    #[error("Malformed records file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Read and parse an XML article
pub fn read_document(relative_path: &RelativePath, data_root: &Path) -> Result<Tree, IoError> {
    let absolute_path = relative_path.to_path(data_root);
    if !absolute_path.exists() {
        return Err(IoError::NotFound(absolute_path));
    }
    let content = fs::read_to_string(&absolute_path)?;
    Ok(Tree::from_xml(&content)?)
}

/// Write the data view of a tree back to disk
pub fn write_document(
    relative_path: &RelativePath,
    data_root: &Path,
    tree: &Tree,
) -> Result<(), IoError> {
    let absolute_path = relative_path.to_path(data_root);

    if let Some(parent) = absolute_path.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::write(&absolute_path, tree.to_xml(tree.root()))?;
    Ok(())
}

/// Scan for XML articles in the data directory
pub fn scan_xml_files(data_root: &Path) -> Result<Vec<PathBuf>, IoError> {
    if !data_root.exists() {
        return Err(IoError::InvalidDataDir(
            "data directory not found".to_string(),
        ));
    }

    let mut files = Vec::new();
    scan_directory_recursive(data_root, &mut files)?;
    files.sort();
    Ok(files)
}

fn scan_directory_recursive(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), IoError> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();

        if path.is_dir() {
            scan_directory_recursive(&path, files)?;
        } else if let Some(ext) = path.extension()
            && ext == "xml"
        {
            files.push(path);
        }
    }

    Ok(())
}

pub fn validate_data_dir(path: &Path) -> Result<(), IoError> {
    if !path.exists() || !path.is_dir() {
        return Err(IoError::InvalidDataDir(
            "Directory does not exist".to_string(),
        ));
    }

    Ok(())
}

/// Load a JSON object mapping reference strings to records
pub fn load_records<T: DeserializeOwned>(path: &Path) -> Result<HashMap<String, T>, IoError> {
    if !path.exists() {
        return Err(IoError::NotFound(path.to_path_buf()));
    }
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
