use anyhow::{Context, Result, anyhow};
use std::path::Path;
use std::process::Command;
use tracing::warn;

/// Language codes the local tesseract install can load.
pub fn list_tesseract_languages() -> Result<Vec<String>> {
    let stdout = run_checked(Command::new("tesseract").arg("--list-langs"), "tesseract --list-langs")?;
    Ok(parse_language_list(&stdout))
}

/// The first line of `--list-langs` names the tessdata directory.
fn parse_language_list(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .skip(1)
        .map(str::trim)
        .filter(|lang| !lang.is_empty())
        .map(str::to_string)
        .collect()
}

/// Picks the requested languages tesseract actually has installed and joins
/// them the way `-l` expects (`eng+deu`).
pub(super) fn normalize_ocr_languages(requested: &[String]) -> Result<String> {
    let wanted = requested
        .iter()
        .flat_map(|raw| raw.split(['+', ',', ' ']))
        .map(str::trim)
        .filter(|lang| !lang.is_empty())
        .collect::<Vec<_>>();
    if wanted.is_empty() {
        return Err(anyhow!("ocr languages is empty"));
    }

    let available = match list_tesseract_languages() {
        Ok(list) => list,
        Err(_) => return Ok(wanted.join("+")),
    };
    select_languages(&wanted, &available)
}

fn select_languages(wanted: &[&str], available: &[String]) -> Result<String> {
    let mut chosen = Vec::new();
    let mut missing = Vec::new();
    for lang in wanted {
        if available.iter().any(|value| value == lang) {
            chosen.push(lang.to_string());
        } else {
            missing.push(lang.to_string());
        }
    }

    if chosen.is_empty() {
        return Err(anyhow!(
            "ocr language(s) not available: {} (available: {})",
            missing.join(", "),
            available.join(", ")
        ));
    }
    if !missing.is_empty() {
        warn!(
            "ocr language(s) not available: {} (available: {})",
            missing.join(", "),
            available.join(", ")
        );
    }

    Ok(chosen.join("+"))
}

/// Word boxes for one page image, as tesseract's TSV report on stdout.
pub(super) fn run_tesseract_tsv(image: &Path, languages: &str, psm: u32, dpi: u32) -> Result<String> {
    let psm = psm.to_string();
    let dpi = dpi.to_string();
    let mut command = Command::new("tesseract");
    command
        .arg(image)
        .arg("stdout")
        .args(["-l", languages, "--oem", "1"])
        .args(["--psm", psm.as_str(), "--dpi", dpi.as_str()])
        .arg("tsv");
    run_checked(&mut command, "tesseract")
}

fn run_checked(command: &mut Command, label: &str) -> Result<String> {
    let output = command
        .output()
        .with_context(|| format!("failed to run {} (is tesseract installed?)", label))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!("{} failed: {}", label, stderr.trim()));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
