//! Config validation: schema checks with user-friendly error messages.

use chanlogs_core::{parse_utc_offset, EventType, Template};
use thiserror::Error;

use crate::schema::{Backend, ChanlogsConfig};

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// A collection of validation errors found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &ChanlogsConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_backend(config, &mut report);
    validate_timezones(config, &mut report);
    validate_templates(config, &mut report);
    validate_commands(config, &mut report);
    report
}

fn validate_backend(config: &ChanlogsConfig, report: &mut ValidationReport) {
    match config.backend {
        Backend::Database => {
            if config.connection_string.as_deref().map(str::trim).unwrap_or("").is_empty() {
                report.error(
                    "connection_string",
                    "The database backend requires a connection string",
                );
            }
            if config.by_day {
                report.warn("by_day", "Daily partitioning only applies to the file backend");
            }
        }
        Backend::File => {
            if config.logdir.as_os_str().is_empty() {
                report.error("logdir", "Log directory cannot be empty");
            }
            if config.connection_string.is_some() {
                report.warn("connection_string", "Ignored by the file backend");
            }
        }
    }
}

fn validate_timezones(config: &ChanlogsConfig, report: &mut ValidationReport) {
    if let Err(e) = parse_utc_offset(&config.timezone) {
        report.error("timezone", e.to_string());
    }
    for (channel, zone) in &config.channel_timezones {
        if let Err(e) = parse_utc_offset(zone) {
            report.error(format!("channel_timezones.{channel}"), e.to_string());
        }
    }
}

fn validate_templates(config: &ChanlogsConfig, report: &mut ValidationReport) {
    for (key, template) in &config.templates {
        let path = format!("templates.{key}");
        if EventType::from_template_key(key).is_none() {
            report.warn(&path, format!("No template defined for '{key}'; override ignored"));
            continue;
        }
        if template.is_empty() {
            report.warn(&path, "Empty override; the built-in template is used");
            continue;
        }
        if let Err(e) = Template::parse(template) {
            report.error(&path, e.to_string());
        }
    }
}

fn validate_commands(config: &ChanlogsConfig, report: &mut ValidationReport) {
    if config.allow_toggle && config.command_prefix.is_empty() {
        report.error("command_prefix", "A command prefix is required when allow_toggle is set");
    }
}
