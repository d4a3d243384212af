pub mod config;
pub mod error;
pub mod footer;
pub mod planner;
pub mod resolver;
pub mod scanner;
pub mod source_map;

mod autoload;

pub use autoload::{load_modules, load_plugins, LoaderContext, ModuleRequest};
pub use config::{DependencyOptions, DirectOptions, LoaderOptions};
pub use error::{LoaderError, Result};
pub use footer::{TransformOutput, MODULES_MARKER, PLUGINS_MARKER};
pub use resolver::{ModuleId, Resolve};
pub use source_map::{SourceMap, SourceMapError};

/// Transform entry point for one module.
///
/// The host calls this once per file with the module text, its source map if
/// it has one, and a resolver that behaves like the host's own import
/// resolution. Direct mode never touches the resolver and never suspends;
/// dependency mode finishes once every `require` in the file has resolved.
///
/// Any error aborts the file: no partial output is produced.
pub async fn transform<C, R>(
    options: &LoaderOptions,
    ctx: &mut C,
    resolver: &R,
    content: &str,
    source_map: Option<&SourceMap>,
) -> Result<TransformOutput>
where
    C: LoaderContext + ?Sized,
    R: Resolve + ?Sized,
{
    match options {
        LoaderOptions::Direct(direct) => load_plugins(ctx, direct, content, source_map),
        LoaderOptions::Dependencies(dependencies) => {
            load_modules(ctx, resolver, dependencies, content, source_map).await
        }
    }
}
