//! Local filesystem scanner: lists importable folders under the configured
//! root, filters hidden entries, and applies the extension allow-list.

use crate::models::Folder;
use std::fs;
use std::io;
use std::path::Path;
use tracing::debug;

/// Immediate non-hidden subdirectories of `root`, each annotated with a
/// recursive file count.
pub fn list_folders(root: &Path) -> io::Result<Vec<Folder>> {
    let mut folders = Vec::new();

    for name in list_entries(root)? {
        let full_path = root.join(&name);
        if !full_path.is_dir() {
            continue;
        }

        let item_count = count_items(&full_path)?;
        folders.push(Folder {
            folder_name: name,
            full_path,
            item_count,
        });
    }

    debug!("Found {} folder(s) under {:?}", folders.len(), root);
    Ok(folders)
}

/// Non-hidden immediate children of `path` (files and directories), in
/// filesystem enumeration order. Callers must not assume a stable order
/// across scans.
pub fn list_entries(path: &Path) -> io::Result<Vec<String>> {
    let mut names = Vec::new();

    for entry in fs::read_dir(path)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if !is_hidden(&name) {
            names.push(name);
        }
    }

    Ok(names)
}

/// Recursive count of non-hidden files under `path`.
pub fn count_items(path: &Path) -> io::Result<usize> {
    let mut count = 0;

    for name in list_entries(path)? {
        let child = path.join(&name);
        if child.is_dir() {
            count += count_items(&child)?;
        } else {
            count += 1;
        }
    }

    Ok(count)
}

/// Case-insensitive match of a file name's extension against the allow-list.
/// Hidden files (leading `.`) are always rejected regardless of extension.
pub fn is_valid_extension(name: &str, allowed: &[String]) -> bool {
    if is_hidden(name) {
        return false;
    }

    let ext = name.rsplit('.').next().unwrap_or_default();
    allowed.iter().any(|a| a.eq_ignore_ascii_case(ext))
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}
