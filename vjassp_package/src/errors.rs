use std::path::Path;
use vjassp_syntax::{ErrorReporter, Pos};

pub(crate) fn import_not_found(errors: &impl ErrorReporter, pos: Pos, path: &Path) {
    errors.report(pos, format!("No such file {}", path.display()));
}

pub(crate) fn mass_import_not_a_directory(errors: &impl ErrorReporter, pos: Pos, path: &Path) {
    errors.report(pos, format!("No such directory {}", path.display()));
}

pub(crate) fn not_utf8(errors: &impl ErrorReporter, pos: Pos, path: &Path) {
    errors.warn(
        pos,
        format!(
            "{} is not valid UTF-8, bytes were decoded as Latin-1",
            path.display()
        ),
    );
}
