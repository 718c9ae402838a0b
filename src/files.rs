//! # Image Listing
//!
//! Finds image files in a directory, for handing captured frames on to other tools.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::fs;
use std::path::{Path, PathBuf};

use log::warn;
use serde::Serialize;

use crate::error::{Error, Result};

// -----------------------------------------------------------------------------------------------
// CONSTANTS
// -----------------------------------------------------------------------------------------------

/// Extensions treated as images, compared without case.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "bmp", "tiff", "tif", "gif"];

// -----------------------------------------------------------------------------------------------
// DATA STRUCTURES
// -----------------------------------------------------------------------------------------------

/// Images found in a directory.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageListing {
    pub directory: PathBuf,
    pub count: usize,
    pub images: Vec<ImageEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageEntry {
    pub path: PathBuf,
    pub name: String,
    pub size_bytes: u64,

    /// Lowercase, including the leading dot
    pub extension: String,
}

// -----------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// -----------------------------------------------------------------------------------------------

/// List the image files in `directory`, sorted by path.
///
/// With `recursive` subdirectories are searched too. Entries which can't be read are skipped.
pub fn list_images<P: AsRef<Path>>(directory: P, recursive: bool) -> Result<ImageListing> {
    let directory = directory.as_ref();

    if !directory.is_dir() {
        return Err(Error::InvalidDirectory {
            path: directory.to_path_buf(),
            reason: String::from("not a directory"),
        });
    }

    let directory = directory
        .canonicalize()
        .map_err(|e| Error::InvalidDirectory {
            path: directory.to_path_buf(),
            reason: e.to_string(),
        })?;

    let mut files = Vec::new();
    collect_files(&directory, recursive, &mut files);
    files.sort();

    let images: Vec<ImageEntry> = files
        .into_iter()
        .filter_map(|path| {
            let extension = image_extension(&path)?;
            let size_bytes = match path.metadata() {
                Ok(m) => m.len(),
                Err(e) => {
                    warn!("Could not stat {:?}: {}", path, e);
                    return None;
                }
            };
            let name = path.file_name()?.to_string_lossy().into_owned();

            Some(ImageEntry {
                path,
                name,
                size_bytes,
                extension,
            })
        })
        .collect();

    Ok(ImageListing {
        directory,
        count: images.len(),
        images,
    })
}

// -----------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// -----------------------------------------------------------------------------------------------

fn collect_files(dir: &Path, recursive: bool, out: &mut Vec<PathBuf>) {
    let entries = match fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            warn!("Could not read directory {:?}: {}", dir, e);
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();

        if path.is_file() {
            out.push(path);
        } else if recursive && path.is_dir() {
            collect_files(&path, recursive, out);
        }
    }
}

fn image_extension(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_string_lossy().to_ascii_lowercase();

    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Some(format!(".{}", ext))
    } else {
        None
    }
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------
