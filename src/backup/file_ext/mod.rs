use itertools::Itertools;
use std::sync::Arc;

pub trait FileExtProvider {
    fn file_ext(&self) -> Option<Arc<str>>;
}

/// Joins every non-empty extension in order, each prefixed with `.`.
///
/// Returns an empty string when nothing contributes an extension.
pub fn join_file_ext<'a, P, I>(providers: I) -> String
where
    P: FileExtProvider + 'a,
    I: IntoIterator<Item = &'a P>,
{
    providers
        .into_iter()
        .filter_map(|p| p.file_ext())
        .filter(|ext| !ext.is_empty())
        .map(|ext| format!(".{ext}"))
        .join("")
}
