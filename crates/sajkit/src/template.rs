//! Rendering configuration files from Jinja templates.
//!
//! Templates are rendered with [`minijinja`]. Undefined variables are an
//! error by default. When the caller opts out, the template is rendered a
//! second time with lenient undefined handling and a warning is logged.
use std::path::{Path, PathBuf};

use minijinja::{Environment, UndefinedBehavior};
use snafu::prelude::*;

use crate::{
    utils::backup_file, InvalidRequestSnafu, ResourceNotFoundSnafu, Result, TemplateSnafu,
    WriteFileSnafu,
};


/// Extension stripped from a template path to find its default destination.
pub const TEMPLATE_EXTENSION: &str = "j2";

fn render_str(
    source: &str,
    vars: &impl serde::Serialize,
    behavior: UndefinedBehavior,
) -> core::result::Result<String, minijinja::Error> {
    let mut env = Environment::new();
    env.set_undefined_behavior(behavior);
    env.render_str(source, vars)
}

/// Renders the template at `path` with `vars`.
///
/// `vars` is anything that serializes to a map, eg a `HashMap`, a
/// `serde_json` object or [`minijinja::context!`].
pub fn render_template_file(
    path: impl AsRef<Path>,
    vars: &impl serde::Serialize,
    fail_on_undefined: bool,
) -> Result<String> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path).context(ResourceNotFoundSnafu { path })?;
    log::debug!("rendering template {}", path.display());

    match render_str(&source, vars, UndefinedBehavior::Strict) {
        Ok(rendered) => Ok(rendered),
        Err(err)
            if err.kind() == minijinja::ErrorKind::UndefinedError && !fail_on_undefined =>
        {
            log::warn!(
                "undefined variables when rendering template {}: {err}",
                path.display()
            );
            render_str(&source, vars, UndefinedBehavior::Lenient).context(TemplateSnafu { path })
        }
        Err(err) => Err(err).context(TemplateSnafu { path }),
    }
}

/// Options for [`write_template_file`].
#[derive(Debug, Clone, PartialEq)]
pub struct WriteOptions {
    /// Where to write. Defaults to the template path without its `.j2`
    /// extension.
    pub destination: Option<PathBuf>,
    pub fail_on_undefined: bool,
    /// Copy an existing destination aside with a timestamp suffix before
    /// overwriting it.
    pub backup_original: bool,
    /// A line written above the rendered content, eg "managed by saj, do
    /// not edit".
    pub modification_message: Option<String>,
}

impl Default for WriteOptions {
    fn default() -> Self {
        WriteOptions {
            destination: None,
            fail_on_undefined: true,
            backup_original: true,
            modification_message: None,
        }
    }
}

impl WriteOptions {
    pub fn destination(mut self, destination: impl Into<PathBuf>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    pub fn fail_on_undefined(mut self, fail: bool) -> Self {
        self.fail_on_undefined = fail;
        self
    }

    pub fn backup_original(mut self, backup: bool) -> Self {
        self.backup_original = backup;
        self
    }

    pub fn modification_message(mut self, message: impl Into<String>) -> Self {
        self.modification_message = Some(message.into());
        self
    }
}

/// Returns the default destination of a template: its path without the
/// `.j2` extension.
pub fn default_destination(template: &Path) -> Result<PathBuf> {
    ensure!(
        template.extension().is_some_and(|ext| ext == TEMPLATE_EXTENSION),
        InvalidRequestSnafu {
            msg: format!(
                "template '{}' has no .{TEMPLATE_EXTENSION} extension and no destination was given",
                template.display()
            )
        }
    );
    Ok(template.with_extension(""))
}

/// Renders `template` and writes the result, returning the path written to.
///
/// Nothing is written or backed up if rendering fails.
pub fn write_template_file(
    template: impl AsRef<Path>,
    vars: &impl serde::Serialize,
    options: &WriteOptions,
) -> Result<PathBuf> {
    let template = template.as_ref();
    let destination = match &options.destination {
        Some(destination) => destination.clone(),
        None => default_destination(template)?,
    };

    let mut rendered = render_template_file(template, vars, options.fail_on_undefined)?;
    if let Some(message) = options.modification_message.as_deref().filter(|m| !m.is_empty()) {
        rendered = format!("{message}\n{rendered}");
    }

    if options.backup_original && destination.is_file() {
        let backup = backup_file(&destination, None)?;
        log::info!("backed up {} to {}", destination.display(), backup.display());
    }
    std::fs::write(&destination, rendered).context(WriteFileSnafu { path: &destination })?;
    log::debug!("wrote {}", destination.display());
    Ok(destination)
}
