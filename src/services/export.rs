//! 导出：单文件原样写盘，文件夹打包成 zip，落在应用导出目录。

use std::fmt;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::kernel::workspace::ExportEntry;

use super::storage;

#[derive(Debug)]
pub enum ExportError {
    Io(io::Error),
    Zip(zip::result::ZipError),
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportError::Io(e) => write!(f, "io error: {e}"),
            ExportError::Zip(e) => write!(f, "zip error: {e}"),
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExportError::Io(e) => Some(e),
            ExportError::Zip(e) => Some(e),
        }
    }
}

impl From<io::Error> for ExportError {
    fn from(e: io::Error) -> Self {
        ExportError::Io(e)
    }
}

impl From<zip::result::ZipError> for ExportError {
    fn from(e: zip::result::ZipError) -> Self {
        ExportError::Zip(e)
    }
}

pub fn write_file_export(name: &str, content: &str) -> Result<PathBuf, ExportError> {
    let dir = storage::ensure_export_dir()?;
    write_file_export_to(&dir, name, content)
}

pub fn write_file_export_to(
    dir: &Path,
    name: &str,
    content: &str,
) -> Result<PathBuf, ExportError> {
    let path = dir.join(name);
    std::fs::write(&path, content)?;
    Ok(path)
}

pub fn write_zip_export(
    archive_name: &str,
    entries: &[ExportEntry],
) -> Result<PathBuf, ExportError> {
    let dir = storage::ensure_export_dir()?;
    write_zip_export_to(&dir, archive_name, entries)
}

/// 空文件夹也进档案，解包后结构与工作区树一致。
pub fn write_zip_export_to(
    dir: &Path,
    archive_name: &str,
    entries: &[ExportEntry],
) -> Result<PathBuf, ExportError> {
    let path = dir.join(archive_name);
    let file = File::create(&path)?;
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default();

    for entry in entries {
        match &entry.content {
            Some(content) => {
                writer.start_file(&entry.path, options)?;
                writer.write_all(content.as_bytes())?;
            }
            None => {
                writer.add_directory(&entry.path, options)?;
            }
        }
    }
    writer.finish()?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn single_file_export_is_byte_exact() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file_export_to(dir.path(), "index.php", "<?php\necho 1;\n").unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "<?php\necho 1;\n");
    }

    #[test]
    fn zip_export_preserves_tree_and_empty_folders() {
        let dir = tempfile::tempdir().unwrap();
        let entries = vec![
            ExportEntry {
                path: "src".into(),
                content: None,
            },
            ExportEntry {
                path: "src/helpers.php".into(),
                content: Some("<?php\n".into()),
            },
            ExportEntry {
                path: "empty".into(),
                content: None,
            },
        ];
        let path = write_zip_export_to(dir.path(), "workspace.zip", &entries).unwrap();

        let mut archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
        let names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        assert!(names.iter().any(|n| n == "src/"));
        assert!(names.iter().any(|n| n == "empty/"));

        let mut content = String::new();
        archive
            .by_name("src/helpers.php")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "<?php\n");
    }
}
