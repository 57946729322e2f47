use crate::errors::LowerError;
use indexmap::IndexMap;
use std::path::PathBuf;
use vjassp_syntax::ast::{ContainerNode, MemberNode, UnitNode};
use vjassp_syntax::{ErrorReporter, Pos};

// Aliases the dialect ships with; the target spells its primitives out in
// full.
const BUILTIN_ALIASES: &[(&str, &str)] = &[
    ("int", "integer"),
    ("bool", "boolean"),
    ("str", "string"),
];

/// All `alias N extends B` declarations of the compilation, program-wide
/// like every other name in the target dialect. User aliases are consulted
/// before builtins; chains resolve transitively and loops are rejected up
/// front so `resolve` is total.
pub(crate) struct AliasTable {
    map: IndexMap<String, (Pos, String)>,
}

impl AliasTable {
    pub(crate) fn build(errors: &impl ErrorReporter, units: &[(PathBuf, UnitNode)]) -> Self {
        let mut map = IndexMap::default();
        for (_, unit) in units {
            for container in unit.containers() {
                collect(errors, container, &mut map);
            }
        }

        let table = Self { map };
        table.reject_cycles(errors);
        table
    }

    fn reject_cycles(&self, errors: &impl ErrorReporter) {
        for (name, (pos, _)) in &self.map {
            let mut seen = vec![name.as_str()];
            let mut current = name.as_str();
            while let Some(next) = self.step(current) {
                if seen.contains(&next) {
                    errors.alias_cycle(*pos, name);
                    break;
                }
                seen.push(next);
                current = next;
            }
        }
    }

    fn step(&self, name: &str) -> Option<&str> {
        if let Some((_, base)) = self.map.get(name) {
            return Some(base.as_str());
        }
        BUILTIN_ALIASES
            .iter()
            .find(|(alias, _)| *alias == name)
            .map(|(_, base)| *base)
    }

    pub(crate) fn resolve(&self, name: &str) -> String {
        let mut seen = vec![name];
        let mut current = name;
        while let Some(next) = self.step(current) {
            if seen.contains(&next) {
                break;
            }
            seen.push(next);
            current = next;
        }
        current.to_string()
    }
}

fn collect(
    errors: &impl ErrorReporter,
    container: &ContainerNode,
    map: &mut IndexMap<String, (Pos, String)>,
) {
    for member in &container.members {
        match member {
            MemberNode::TypeDecl(decl) if decl.alias => {
                let name = decl.name.value.clone();
                if map.contains_key(&name) {
                    errors.redeclared_symbol(decl.name.pos, &name);
                } else {
                    map.insert(name, (decl.name.pos, decl.base.value.clone()));
                }
            }
            MemberNode::Nested(nested) => collect(errors, nested, map),
            _ => {}
        }
    }
}
