//! Derives the instance name that namespaces the lock and pid files.

use std::path::Path;

/// Derives an instance name from a program path.
///
/// The directory prefix and the last `.`-delimited segment are removed, so
/// `/opt/app/myservice.sh` becomes `myservice` and `a.b.tar.gz` becomes
/// `a.b.tar`. A leading-dot name such as `.hidden` is kept whole.
///
/// Returns `None` when the path has no final component.
pub fn derive_name<P: AsRef<Path>>(program: P) -> Option<String> {
    let file_name = program.as_ref().file_name()?.to_string_lossy();

    let name = match file_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => &file_name[..],
    };

    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}
