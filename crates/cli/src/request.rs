//! `mbook request`: serve one wire request from a file or stdin.

use std::io::Read;
use std::path::{Path, PathBuf};

use matchbook_recon::wire::{execute, ReconRequest, StagedSource};
use matchbook_recon::ReconError;

use crate::exit_codes::{recon_exit_code, EXIT_ERROR, EXIT_INPUT, EXIT_USAGE};
use crate::CliError;

/// Resolves staged locations on the local filesystem.
///
/// Accepts `file://` URLs and bare paths. Relative paths resolve against
/// `base`. Any other URL scheme is refused.
pub struct LocalStage {
    base: PathBuf,
}

impl LocalStage {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    fn resolve(&self, url: &str) -> Result<PathBuf, ReconError> {
        let path = match url.strip_prefix("file://") {
            Some(rest) => rest,
            None if has_scheme(url) => {
                return Err(ReconError::StagedFetch {
                    url: url.to_string(),
                    message: "only file:// and local paths are supported".into(),
                });
            }
            None => url,
        };
        let path = Path::new(path);
        Ok(if path.is_absolute() { path.to_path_buf() } else { self.base.join(path) })
    }
}

/// `scheme://…` with an alphabetic scheme; Windows drive letters don't count.
fn has_scheme(url: &str) -> bool {
    match url.split_once("://") {
        Some((scheme, _)) => {
            scheme.len() > 1
                && scheme.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

impl StagedSource for LocalStage {
    fn fetch(&self, url: &str) -> Result<String, ReconError> {
        let path = self.resolve(url)?;
        tracing::debug!("reading staged source {}", path.display());
        std::fs::read_to_string(&path).map_err(|e| ReconError::StagedFetch {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

pub fn cmd_request(file: Option<PathBuf>, output: Option<PathBuf>) -> Result<(), CliError> {
    let (text, base) = match &file {
        Some(path) if path.as_os_str() != "-" => {
            let text = std::fs::read_to_string(path).map_err(|e| CliError {
                code: EXIT_USAGE,
                message: format!("cannot read request {}: {e}", path.display()),
                hint: None,
            })?;
            let base = path.parent().map(Path::to_path_buf).unwrap_or_default();
            (text, base)
        }
        _ => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text).map_err(|e| CliError {
                code: EXIT_INPUT,
                message: format!("cannot read request from stdin: {e}"),
                hint: None,
            })?;
            (text, PathBuf::from("."))
        }
    };

    let engine_err = |e: ReconError| CliError { code: recon_exit_code(&e), message: e.to_string(), hint: None };
    let request = ReconRequest::from_json(&text).map_err(engine_err)?;
    let response = execute(&request, &LocalStage::new(base)).map_err(engine_err)?;

    let json_str = serde_json::to_string(&response).map_err(|e| CliError {
        code: EXIT_ERROR,
        message: format!("JSON serialization error: {e}"),
        hint: None,
    })?;

    match output {
        Some(path) => std::fs::write(&path, &json_str).map_err(|e| CliError {
            code: EXIT_ERROR,
            message: format!("cannot write output: {e}"),
            hint: None,
        })?,
        None => println!("{json_str}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_detection() {
        assert!(has_scheme("s3://bucket/a.csv"));
        assert!(has_scheme("https://example.com/a.csv"));
        assert!(!has_scheme("data/a.csv"));
        assert!(!has_scheme("C://data/a.csv"));
    }

    #[test]
    fn resolves_relative_and_file_urls() {
        let stage = LocalStage::new("/srv/requests");
        assert_eq!(stage.resolve("a.csv").unwrap(), PathBuf::from("/srv/requests/a.csv"));
        assert_eq!(stage.resolve("file:///tmp/b.csv").unwrap(), PathBuf::from("/tmp/b.csv"));
        assert!(matches!(
            stage.resolve("s3://bucket/a.csv"),
            Err(ReconError::StagedFetch { .. })
        ));
    }

    #[test]
    fn fetch_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.csv"), "amount\n1\n").unwrap();
        let stage = LocalStage::new(dir.path());
        assert_eq!(stage.fetch("a.csv").unwrap(), "amount\n1\n");
        assert!(stage.fetch("missing.csv").is_err());
    }
}
