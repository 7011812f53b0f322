//! Test command templates
//!
//! The test command may reference the live configuration file as `{config}`.
//! `{{` and `}}` are literal braces. A template whose placeholders are all
//! unknown names is run verbatim; an unbalanced or positional one is
//! malformed.

use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Placeholder replaced by the pipeline path
pub const CONFIG_PLACEHOLDER: &str = "config";

/// Reasons a template could not be rendered
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// A `{name}` other than `{config}`
    #[error("unknown placeholder '{{{0}}}'")]
    UnknownPlaceholder(String),

    /// Unbalanced braces, empty or positional placeholders
    #[error("{0}")]
    Malformed(String),
}

/// Substitutes `{config}` in `template` with `pipeline_path`
pub fn render(template: &str, pipeline_path: &Path) -> Result<String, TemplateError> {
    let path = pipeline_path.display().to_string();
    let mut rendered = String::with_capacity(template.len() + path.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                rendered.push('{');
            }
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some('{') => {
                            return Err(TemplateError::Malformed(
                                "unexpected '{' in placeholder".to_string(),
                            ));
                        }
                        Some(c) => name.push(c),
                        None => {
                            return Err(TemplateError::Malformed(
                                "single '{' encountered in template".to_string(),
                            ));
                        }
                    }
                }

                if name.is_empty() || name.chars().all(|c| c.is_ascii_digit()) {
                    return Err(TemplateError::Malformed(format!(
                        "positional placeholder '{{{}}}' is not supported",
                        name
                    )));
                }

                if name != CONFIG_PLACEHOLDER {
                    return Err(TemplateError::UnknownPlaceholder(name));
                }
                rendered.push_str(&path);
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                rendered.push('}');
            }
            '}' => {
                return Err(TemplateError::Malformed(
                    "single '}' encountered in template".to_string(),
                ));
            }
            c => rendered.push(c),
        }
    }

    Ok(rendered)
}

/// Renders the test command, falling back to the raw template when it only
/// names unknown placeholders
///
/// Returns the malformation message when the template cannot be used at all.
pub fn render_test_command(template: &str, pipeline_path: &Path) -> Result<String, String> {
    match render(template, pipeline_path) {
        Ok(command) => Ok(command),
        Err(TemplateError::UnknownPlaceholder(name)) => {
            debug!(
                "Test command has no {{{}}} placeholder (found '{{{}}}'), running it verbatim",
                CONFIG_PLACEHOLDER, name
            );
            Ok(template.to_string())
        }
        Err(e @ TemplateError::Malformed(_)) => Err(e.to_string()),
    }
}
