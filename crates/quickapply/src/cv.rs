use crate::error::ApplyError;
use std::path::Path;

/// Reads the text layer of the CV. Done once per run; the text only feeds
/// cover-letter generation.
pub fn extract_text(path: &Path) -> Result<String, ApplyError> {
    let raw = pdf_extract::extract_text(path).map_err(|e| ApplyError::Config {
        missing: vec![format!("readable PDF CV at {} ({})", path.display(), e)],
    })?;
    let text = tidy(&raw);
    if text.is_empty() {
        log::warn!("[!] {} has no extractable text", path.display());
    } else {
        log::info!("[*] Read {} characters from the CV", text.len());
    }
    Ok(text)
}

/// Trims every line and collapses runs of blank lines left by the PDF layout.
fn tidy(raw: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    for line in raw.lines().map(str::trim) {
        if line.is_empty() && lines.last().map_or(true, |l| l.is_empty()) {
            continue;
        }
        lines.push(line);
    }
    lines.join("\n").trim().to_string()
}
