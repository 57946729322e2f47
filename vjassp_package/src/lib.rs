mod errors;

use errors::{import_not_found, mass_import_not_a_directory, not_utf8};
use indexmap::IndexSet;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use vjassp_syntax::ast::{ImportNode, UnitNode};
use vjassp_syntax::{parse, ErrorReporter, FileManager, Pos};
use walkdir::WalkDir;

pub const SOURCE_EXTENSION: &str = "jp";

/// One parsed unit, keyed by its canonical path.
pub struct LoadedUnit {
    pub path: PathBuf,
    pub ast: UnitNode,
}

/// Loads the entry file and everything it transitively imports, returning
/// the parsed units in depth-first post-order so that every unit's
/// dependencies precede it. Re-importing an already visited canonical path
/// is a no-op, which also makes import cycles harmless.
///
/// Only the entry read can fail as an `Err`; problems inside the import
/// graph surface as diagnostics carrying the importing location.
pub fn load_units(
    file_manager: &mut FileManager,
    errors: &impl ErrorReporter,
    entry: &Path,
    defines: &IndexSet<String>,
) -> Result<Vec<LoadedUnit>, std::io::Error> {
    let entry = entry.canonicalize()?;

    let mut loader = Loader {
        file_manager,
        errors,
        defines,
        visited: IndexSet::default(),
        units: Vec::default(),
    };
    loader.visit_entry(entry)?;
    Ok(loader.units)
}

struct Loader<'a, E> {
    file_manager: &'a mut FileManager,
    errors: &'a E,
    defines: &'a IndexSet<String>,
    visited: IndexSet<PathBuf>,
    units: Vec<LoadedUnit>,
}

impl<'a, E: ErrorReporter> Loader<'a, E> {
    fn visit_entry(&mut self, path: PathBuf) -> Result<(), std::io::Error> {
        self.visited.insert(path.clone());
        let file = self.file_manager.open(path.clone())?;
        if file.latin1_fallback {
            not_utf8(self.errors, file.offset, &path);
        }

        let ast = parse(self.errors, &file);
        if self.errors.has_errors() {
            return Ok(());
        }

        let imports: Vec<(Pos, Option<String>, String)> = ast
            .imports()
            .map(|import| {
                (
                    import.pos,
                    import.when.as_ref().map(|tok| tok.value.clone()),
                    import_path_text(import),
                )
            })
            .collect();

        for (pos, when, path_text) in imports {
            if let Some(define) = when {
                if !self.defines.contains(&define) {
                    continue;
                }
            }
            self.visit_import(&path, pos, &path_text);
            if self.errors.has_errors() {
                return Ok(());
            }
        }

        self.units.push(LoadedUnit { path, ast });
        Ok(())
    }

    fn visit_import(&mut self, importer: &Path, pos: Pos, path_text: &str) {
        let base = importer.parent().unwrap_or(Path::new("."));

        if let Some(dir) = path_text.strip_suffix("/**") {
            self.visit_mass_import(base, pos, dir, true);
        } else if let Some(dir) = path_text.strip_suffix("/*") {
            self.visit_mass_import(base, pos, dir, false);
        } else {
            let mut target = base.join(path_text);
            if target.extension().is_none() {
                target.set_extension(SOURCE_EXTENSION);
            }
            self.visit_one(pos, &target);
        }
    }

    fn visit_mass_import(&mut self, base: &Path, pos: Pos, dir: &str, recursive: bool) {
        let dir = base.join(dir);
        if !dir.is_dir() {
            mass_import_not_a_directory(self.errors, pos, &dir);
            return;
        }

        let mut walk = WalkDir::new(&dir).sort_by_file_name();
        if !recursive {
            walk = walk.max_depth(1);
        }

        let mut found = Vec::default();
        for dir_entry in walk.into_iter().filter_map(Result::ok) {
            let path = dir_entry.path();
            if path.extension() == Some(OsStr::new(SOURCE_EXTENSION)) {
                found.push(path.to_path_buf());
            }
        }
        found.sort();

        for path in found {
            self.visit_one(pos, &path);
            if self.errors.has_errors() {
                return;
            }
        }
    }

    fn visit_one(&mut self, pos: Pos, target: &Path) {
        let Ok(canonical) = target.canonicalize() else {
            import_not_found(self.errors, pos, target);
            return;
        };

        if self.visited.contains(&canonical) {
            return;
        }

        if let Err(err) = self.visit_entry(canonical.clone()) {
            self.errors
                .report(pos, format!("Cannot read {}: {err}", canonical.display()));
        }
    }
}

fn import_path_text(import: &ImportNode) -> String {
    let quoted = &import.path.value;
    quoted[1..quoted.len() - 1].to_string()
}
