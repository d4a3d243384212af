use crate::{
    error::Result,
    planner::FooterEntry,
    source_map::{SourceMap, SourceMapExtender},
};

/// Marker line heading a direct-mode footer. Downstream tooling greps for it.
pub const PLUGINS_MARKER: &str = "/*** REQUIRES FROM autoload-plugins-loader ***/";

/// Marker line heading a dependency-triggered footer. Downstream tooling greps for it.
pub const MODULES_MARKER: &str = "/*** REQUIRES FROM autoload-modules-loader ***/";

/// Placed between the original content and the footer.
pub const SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FooterKind {
    Plugins,
    Modules,
}

impl FooterKind {
    pub fn marker(self) -> &'static str {
        match self {
            FooterKind::Plugins => PLUGINS_MARKER,
            FooterKind::Modules => MODULES_MARKER,
        }
    }

    fn comment_gap(self) -> &'static str {
        match self {
            FooterKind::Plugins => "   ",
            FooterKind::Modules => " ",
        }
    }
}

/// Output of one transform. `map` is present iff a map came in.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformOutput {
    pub code: String,
    pub map: Option<SourceMap>,
}

/// Marker line, then one `require("<id>"); // <label>` line per entry.
pub fn render_footer(kind: FooterKind, entries: &[FooterEntry]) -> String {
    let mut footer = String::from(kind.marker());
    footer.push('\n');

    let lines: Vec<String> = entries
        .iter()
        .map(|entry| {
            format!(
                "require(\"{}\");{}// {}",
                escape_string(entry.id.as_str()),
                kind.comment_gap(),
                entry.label
            )
        })
        .collect();
    footer.push_str(&lines.join("\n"));
    footer
}

fn escape_string(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Appends `footer` to `content`, extending `source_map` when one is given.
/// `file` names the output file of the extended map.
pub fn emit(
    content: &str,
    source_map: Option<&SourceMap>,
    footer: &str,
    file: impl FnOnce() -> String,
) -> Result<TransformOutput> {
    let Some(source_map) = source_map else {
        return Ok(TransformOutput {
            code: format!("{content}{SEPARATOR}{footer}"),
            map: None,
        });
    };

    let mut extender = SourceMapExtender::new(content, source_map)?;
    extender.append(SEPARATOR);
    extender.append(footer);
    let (code, map) = extender.finish(file());

    Ok(TransformOutput {
        code,
        map: Some(map),
    })
}
