use anyhow::{Context, Result, anyhow};
use std::env;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;
use tracing::info;

use super::Rasterizer;

/// Renders pages to PNG with `mutool draw`, falling back to `pdftoppm`.
#[derive(Debug, Clone)]
pub struct CommandRasterizer {
    dpi: u32,
}

impl CommandRasterizer {
    pub fn new(dpi: u32) -> Self {
        Self { dpi }
    }
}

impl Rasterizer for CommandRasterizer {
    fn render(&self, pdf_path: &Path) -> Result<Vec<Vec<u8>>> {
        let dir = tempdir().with_context(|| "failed to create temp dir for pdf")?;
        let dpi = self.dpi.to_string();

        if command_exists("mutool") {
            info!("rasterize: mutool at {} dpi", self.dpi);
            let output = Command::new("mutool")
                .arg("draw")
                .arg("-r")
                .arg(&dpi)
                .arg("-o")
                .arg(dir.path().join("page-%04d.png"))
                .arg(pdf_path)
                .output()
                .with_context(|| "failed to run mutool")?;
            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                return Err(anyhow!("mutool failed: {}", stderr.trim()));
            }
        } else if command_exists("pdftoppm") {
            info!("rasterize: pdftoppm at {} dpi", self.dpi);
            let output = Command::new("pdftoppm")
                .arg("-png")
                .arg("-r")
                .arg(&dpi)
                .arg(pdf_path)
                .arg(dir.path().join("page"))
                .output()
                .with_context(|| "failed to run pdftoppm")?;
            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                return Err(anyhow!("pdftoppm failed: {}", stderr.trim()));
            }
        } else {
            return Err(anyhow!(
                "pdf rendering requires mutool or pdftoppm (install mupdf or poppler)"
            ));
        }

        read_rendered_pages(dir.path())
    }
}

fn read_rendered_pages(dir: &Path) -> Result<Vec<Vec<u8>>> {
    let mut entries: Vec<_> = fs::read_dir(dir)
        .with_context(|| "failed to read temp pdf directory")?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| is_page_image(path))
        .collect();
    entries.sort_by_key(|path| page_number(path));

    let mut pages = Vec::new();
    for path in entries {
        let bytes = fs::read(&path).with_context(|| "failed to read rendered pdf page")?;
        pages.push(bytes);
    }
    Ok(pages)
}

fn is_page_image(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.starts_with("page"))
        .unwrap_or(false)
        && path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("png"))
            .unwrap_or(false)
}

/// Page number embedded in `page-0012.png` / `page-12.png`; pdftoppm pads
/// to the width of the page count, so names alone do not sort numerically.
fn page_number(path: &Path) -> u64 {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(|stem| {
            stem.chars()
                .filter(|ch| ch.is_ascii_digit())
                .collect::<String>()
        })
        .and_then(|digits| digits.parse().ok())
        .unwrap_or(u64::MAX)
}

pub(crate) fn command_exists(cmd: &str) -> bool {
    let path = Path::new(cmd);
    if path.components().count() > 1 {
        return is_executable(path);
    }

    let path_var = match env::var_os("PATH") {
        Some(value) => value,
        None => return false,
    };

    env::split_paths(&path_var).any(|dir| is_executable(&dir.join(cmd)))
}

fn is_executable(path: &Path) -> bool {
    let metadata = match fs::metadata(path) {
        Ok(value) => value,
        Err(_) => return false,
    };
    if !metadata.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        metadata.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rendered_pages_are_read_in_numeric_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("page-10.png"), b"ten").expect("write");
        fs::write(dir.path().join("page-2.png"), b"two").expect("write");
        fs::write(dir.path().join("page-1.png"), b"one").expect("write");
        fs::write(dir.path().join("notes.txt"), b"skip").expect("write");

        let pages = read_rendered_pages(dir.path()).expect("pages");
        assert_eq!(pages, vec![b"one".to_vec(), b"two".to_vec(), b"ten".to_vec()]);
    }

    #[test]
    fn missing_command_is_not_found() {
        assert!(!command_exists("definitely-not-a-real-command-4711"));
    }
}
