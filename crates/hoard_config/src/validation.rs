use std::fmt;

use crate::{HoardConfig, OriginError};

/// Problems found in a loaded configuration.
///
/// Errors stop startup; warnings are logged and serving continues. The
/// `Display` form lists errors first, one `  - ` line per entry.
#[derive(Debug, Default)]
pub struct ConfigReport {
    warnings: Vec<String>,
    errors: Vec<String>,
}

impl ConfigReport {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }
}

impl fmt::Display for ConfigReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sections = [("Errors", &self.errors), ("Warnings", &self.warnings)];
        let mut first = true;
        for (title, items) in sections.into_iter().filter(|(_, items)| !items.is_empty()) {
            if !first {
                writeln!(f)?;
            }
            first = false;
            writeln!(f, "{title}:")?;
            for item in items {
                writeln!(f, "  - {item}")?;
            }
        }
        Ok(())
    }
}

/// Validate a hoard configuration and return a report of issues.
pub fn validate(cfg: &HoardConfig) -> ConfigReport {
    let mut report = ConfigReport::default();

    validate_origin(cfg, &mut report);
    validate_listener(cfg, &mut report);

    report
}

fn validate_origin(cfg: &HoardConfig, report: &mut ConfigReport) {
    let url = match cfg.proxy.origin_url() {
        Ok(url) => url,
        Err(OriginError::Missing) => {
            report.error("--origin URL is required (or set proxy.origin / HOARD_PROXY__ORIGIN)");
            return;
        }
        Err(e) => {
            report.error(e.to_string());
            return;
        }
    };

    if !matches!(url.path(), "" | "/") {
        report.warn(format!(
            "proxy.origin path '{}' is ignored; requests keep their own path",
            url.path()
        ));
    }
    if url.query().is_some() {
        report.warn("proxy.origin query string is ignored");
    }
}

fn validate_listener(cfg: &HoardConfig, report: &mut ConfigReport) {
    if cfg.http.port == 0 {
        report.error("http.port must be between 1 and 65535");
    }
    if cfg.global.worker_connections < 16 {
        report.warn(format!(
            "global.worker_connections = {} is very low; clients will queue",
            cfg.global.worker_connections
        ));
    }
}
