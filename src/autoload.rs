use std::path::{Path, PathBuf};

use path_absolutize::*;
use tracing::debug;

use crate::{
    config::{DependencyOptions, DirectOptions},
    error::{LoaderError, Result},
    footer::{emit, render_footer, FooterKind, TransformOutput},
    planner::{plan_dependencies, plan_direct},
    resolver::{resolve_all, Resolve},
    scanner::scan_requires,
    source_map::SourceMap,
};

/// What the host pipeline exposes about the module being transformed.
pub trait LoaderContext {
    /// Absolute path of the module file.
    fn resource_path(&self) -> &Path;

    /// Full request of the module, loaders included. Becomes the `file` of an
    /// extended source map.
    fn current_request(&self) -> String;

    /// Marks the result as cacheable by the host.
    fn cacheable(&mut self) {}
}

/// A plain [`LoaderContext`] for hosts that do not carry their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRequest {
    pub resource_path: PathBuf,
    pub request: Option<String>,
    pub cacheable: bool,
}

impl ModuleRequest {
    pub fn new(resource_path: impl Into<PathBuf>) -> Self {
        Self {
            resource_path: resource_path.into(),
            request: None,
            cacheable: false,
        }
    }

    pub fn with_request(mut self, request: impl Into<String>) -> Self {
        self.request = Some(request.into());
        self
    }
}

impl LoaderContext for ModuleRequest {
    fn resource_path(&self) -> &Path {
        &self.resource_path
    }

    fn current_request(&self) -> String {
        self.request
            .clone()
            .unwrap_or_else(|| self.resource_path.to_string_lossy().into_owned())
    }

    fn cacheable(&mut self) {
        self.cacheable = true;
    }
}

/// Returns the absolute directory of the module file.
fn module_dir(resource_path: &Path) -> Result<PathBuf> {
    let absolute = resource_path
        .absolutize()
        .map_err(|_| LoaderError::InvalidPath {
            name: resource_path.to_string_lossy().into_owned(),
            base: PathBuf::from("."),
        })?;

    Ok(absolute
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| absolute.to_path_buf()))
}

/// Direct mode: appends a require for every configured plugin, whatever the
/// module contains.
pub fn load_plugins<C>(
    ctx: &mut C,
    options: &DirectOptions,
    content: &str,
    source_map: Option<&SourceMap>,
) -> Result<TransformOutput>
where
    C: LoaderContext + ?Sized,
{
    ctx.cacheable();

    let entries = plan_direct(options)?;
    debug!(
        module = %ctx.resource_path().display(),
        plugins = entries.len(),
        "injecting configured plugins"
    );

    let footer = render_footer(FooterKind::Plugins, &entries);
    emit(content, source_map, &footer, || ctx.current_request())
}

/// Dependency-triggered mode: appends the plugins of every trigger module the
/// content requires. Content and map come back untouched when nothing matches.
pub async fn load_modules<C, R>(
    ctx: &mut C,
    resolver: &R,
    options: &DependencyOptions,
    content: &str,
    source_map: Option<&SourceMap>,
) -> Result<TransformOutput>
where
    C: LoaderContext + ?Sized,
    R: Resolve + ?Sized,
{
    ctx.cacheable();

    let dir = module_dir(ctx.resource_path())?;
    let requests = scan_requires(content);
    debug!(module = %ctx.resource_path().display(), requests = requests.len(), "scanned requires");

    let resolved = resolve_all(resolver, &dir, &requests).await?;
    let entries = plan_dependencies(&options.module_to_plugins_map, &resolved, &dir);

    if entries.is_empty() {
        return Ok(TransformOutput {
            code: content.to_string(),
            map: source_map.cloned(),
        });
    }

    debug!(
        module = %ctx.resource_path().display(),
        plugins = entries.len(),
        source_map = source_map.is_some(),
        "injecting triggered plugins"
    );

    let footer = render_footer(FooterKind::Modules, &entries);
    emit(content, source_map, &footer, || ctx.current_request())
}
