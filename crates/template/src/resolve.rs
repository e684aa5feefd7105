//! Turning a compiled template into a destination path.

use crate::command::EvalContext;
use crate::consts::DEFAULT_REPLACEMENT;
use crate::item::NormalizedItem;
use crate::sanitize::sanitize;
use crate::template::CompiledTemplate;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Evaluates `template` for `item` and splits the result into sanitized path
/// components.
///
/// Components are split on the template's own `/` and on directory-producing
/// wildcards (`%collection(true)%`), see
/// [`CompiledTemplate::render_components`]. Blank components at either end
/// are dropped, so an empty template yields no components at all; a blank
/// component between two others becomes the replacement (`a//b` is
/// `a/_/b`). Every remaining component is sanitized on its own.
#[instrument(level = "debug", skip_all)]
pub fn resolve(template: &CompiledTemplate, item: &NormalizedItem, ctx: &EvalContext<'_>) -> Vec<String> {
    let components = template.render_components(item, ctx);
    let is_blank = |component: &String| component.trim().is_empty();
    let Some(first) = components.iter().position(|c| !is_blank(c)) else {
        return Vec::new();
    };
    let last = components.iter().rposition(|c| !is_blank(c)).unwrap_or(first);
    components[first..=last].iter().map(|component| sanitize(component, DEFAULT_REPLACEMENT)).collect()
}

/// Joins resolved components onto a destination root.
///
/// The root is used as given; only the components have been sanitized.
pub fn join(root: &Path, components: &[String]) -> PathBuf {
    components.iter().fold(root.to_path_buf(), |path, component| path.join(component))
}

/// [`resolve`] followed by [`join`].
pub fn resolve_path(root: &Path, template: &CompiledTemplate, item: &NormalizedItem, ctx: &EvalContext<'_>) -> PathBuf {
    join(root, &resolve(template, item, ctx))
}
