use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use duct::cmd;
use log::{debug, warn};

use crate::PdfError;

/// How long a single conversion may run before it is killed.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Office formats LibreOffice can turn into PDF.
pub const CONVERTIBLE_EXTENSIONS: [&str; 4] = ["doc", "docx", "odt", "rtf"];

/// Well-known install locations, tried after `PATH`.
const SOFFICE_CANDIDATES: [&str; 5] = [
    r"C:\Program Files\LibreOffice\program\soffice.exe",
    r"C:\Program Files (x86)\LibreOffice\program\soffice.exe",
    "/usr/bin/soffice",
    "/usr/bin/libreoffice",
    "/Applications/LibreOffice.app/Contents/MacOS/soffice",
];

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Converts office documents to PDF with a headless LibreOffice.
#[derive(Debug, Clone)]
pub struct Converter {
    program: PathBuf,
    timeout: Duration,
}

impl Converter {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Converter {
            program: program.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Find LibreOffice: `explicit` first, then `soffice` or `libreoffice` on
    /// `PATH`, then the usual install locations.
    pub fn locate(explicit: Option<PathBuf>) -> Result<Self, PdfError> {
        if let Some(program) = explicit {
            return Ok(Self::new(program));
        }
        find_soffice(
            |name| which::which(name).ok(),
            |path| path.is_file(),
        )
        .map(Self::new)
        .ok_or_else(|| {
            PdfError::Conversion(
                "LibreOffice was not found; install it or set FOLIO_SOFFICE".into(),
            )
        })
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Convert `document` into `out_dir`, returning the written PDF path.
    pub fn convert(&self, document: &Path, out_dir: &Path) -> Result<PathBuf, PdfError> {
        let stem = document
            .file_stem()
            .ok_or_else(|| {
                PdfError::Conversion(format!("{} has no file name", document.display()))
            })?;
        let mut file_name = stem.to_os_string();
        file_name.push(".pdf");
        let target = out_dir.join(file_name);

        debug!(
            "converting {} with {}",
            document.display(),
            self.program.display()
        );
        let handle = cmd!(
            &self.program,
            "--headless",
            "--convert-to",
            "pdf",
            "--outdir",
            out_dir,
            document
        )
        .stdout_null()
        .stderr_capture()
        .unchecked()
        .start()
        .map_err(|e| {
            PdfError::Conversion(format!("could not run {}: {}", self.program.display(), e))
        })?;

        let started = Instant::now();
        let output = loop {
            if let Some(output) = handle.try_wait()? {
                break output;
            }
            if started.elapsed() >= self.timeout {
                if let Err(e) = handle.kill() {
                    warn!("failed to stop {}: {}", self.program.display(), e);
                }
                return Err(PdfError::Conversion(format!(
                    "{} timed out after {}s",
                    document.display(),
                    self.timeout.as_secs()
                )));
            }
            thread::sleep(POLL_INTERVAL);
        };

        if !output.status.success() {
            return Err(PdfError::Conversion(format!(
                "{} failed on {}: {}",
                self.program.display(),
                document.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        if !target.is_file() {
            return Err(PdfError::Conversion(format!(
                "{} produced no PDF for {}",
                self.program.display(),
                document.display()
            )));
        }
        Ok(target)
    }
}

/// Pick the first LibreOffice executable, looking names up with `on_path`
/// and checking fixed locations with `exists`.
fn find_soffice(
    on_path: impl Fn(&str) -> Option<PathBuf>,
    exists: impl Fn(&Path) -> bool,
) -> Option<PathBuf> {
    ["soffice", "libreoffice"]
        .into_iter()
        .find_map(&on_path)
        .or_else(|| {
            SOFFICE_CANDIDATES
                .iter()
                .map(Path::new)
                .find(|path| exists(path))
                .map(Path::to_path_buf)
        })
}

/// Whether `path` has an extension [`Converter::convert`] accepts.
pub fn is_convertible(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            CONVERTIBLE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_lookup_comes_first() {
        let found = find_soffice(
            |name| (name == "libreoffice").then(|| PathBuf::from("/nix/bin/libreoffice")),
            |_| true,
        );
        assert_eq!(found, Some(PathBuf::from("/nix/bin/libreoffice")));
    }

    #[test]
    fn falls_back_to_install_locations() {
        let found = find_soffice(|_| None, |path| path == Path::new("/usr/bin/libreoffice"));
        assert_eq!(found, Some(PathBuf::from("/usr/bin/libreoffice")));
    }

    #[test]
    fn nothing_found() {
        assert_eq!(find_soffice(|_| None, |_| false), None);
    }

    #[test]
    fn explicit_program_and_timeout() {
        let converter = Converter::locate(Some(PathBuf::from("/opt/lo/soffice")))
            .unwrap()
            .with_timeout(Duration::from_secs(5));
        assert_eq!(converter.program(), Path::new("/opt/lo/soffice"));
        assert_eq!(converter.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn convertible_extensions() {
        assert!(is_convertible(Path::new("report.DOCX")));
        assert!(is_convertible(Path::new("letter.rtf")));
        assert!(!is_convertible(Path::new("scan.png")));
        assert!(!is_convertible(Path::new("README")));
    }

    #[test]
    fn missing_program_fails_to_start() {
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("notes.odt");
        std::fs::write(&doc, b"").unwrap();

        let converter = Converter::new("/nonexistent/soffice");
        assert!(matches!(
            converter.convert(&doc, dir.path()),
            Err(PdfError::Conversion(_))
        ));
    }
}
