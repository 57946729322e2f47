use crate::alias::AliasTable;
use crate::errors::LowerError;
use crate::hoist::hoist_body;
use crate::name::{init_tag, scope_tag};
use crate::{
    Container, ContainerKind, Function, GlobalVar, Initializer, Member, NativeDecl, Param,
    Program, Requirement, StructDecl, Visibility,
};
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use vjassp_syntax::ast::{
    self, ContainerNode, FunctionNode, InitNode, MemberNode, Modifier, NativeNode, TypeDeclNode,
    UnitNode, VarInit, VarNode,
};
use vjassp_syntax::{ErrorReporter, Pos, Token};

pub const INITIALIZER_NAME: &str = "onInit";
pub const SYSTEM_LIBRARY_NAME: &str = "VJPLIBS";

/// Lowers the parsed units (dependency order, entry last) into the
/// emission model: anonymous scopes get their stable names, `init:` blocks
/// become wrapped functions called from a synthetic `onInit`, locals are
/// hoisted, aliases resolve away and visibility is stamped on every
/// declaration.
pub fn lower(errors: &impl ErrorReporter, units: Vec<(PathBuf, UnitNode)>) -> Program {
    let aliases = AliasTable::build(errors, &units);

    let mut lowerer = Lowerer {
        errors,
        aliases,
        libraries: Vec::default(),
        has_systems: false,
    };

    let mut containers = Vec::default();
    for (path, unit) in units {
        let mut anon_ordinal = 0;
        for item in unit.items {
            if let ast::ItemNode::Container(node) = item {
                containers.push(lowerer.lower_container(&path, &mut anon_ordinal, node));
            }
        }
    }

    Program {
        containers,
        libraries: lowerer.libraries,
        has_systems: lowerer.has_systems,
    }
}

struct Lowerer<'a, E> {
    errors: &'a E,
    aliases: AliasTable,
    libraries: Vec<String>,
    has_systems: bool,
}

impl<'a, E: ErrorReporter> Lowerer<'a, E> {
    fn lower_container(
        &mut self,
        path: &Path,
        anon_ordinal: &mut usize,
        node: ContainerNode,
    ) -> Container {
        let name = match &node.name {
            Some(tok) => tok.value.clone(),
            None => {
                let tag = scope_tag(path, *anon_ordinal);
                *anon_ordinal += 1;
                tag
            }
        };

        let kind = match node.kind {
            ast::ContainerKind::Library | ast::ContainerKind::System => ContainerKind::Library,
            ast::ContainerKind::Scope | ast::ContainerKind::Content => ContainerKind::Scope,
        };

        let mut requires = Vec::default();
        match node.kind {
            ast::ContainerKind::Library => self.libraries.push(name.clone()),
            ast::ContainerKind::System => {
                self.has_systems = true;
                requires.push(Requirement {
                    name: String::from(SYSTEM_LIBRARY_NAME),
                    optional: false,
                });
            }
            _ => {}
        }

        let mut symbols: IndexMap<String, Pos> = IndexMap::default();
        let mut members: Vec<Member> = Vec::default();
        let mut globals_run: Vec<GlobalVar> = Vec::default();
        let mut init_calls: Vec<String> = Vec::default();
        let mut init_ordinal = 0;

        fn flush(members: &mut Vec<Member>, globals_run: &mut Vec<GlobalVar>) {
            if !globals_run.is_empty() {
                members.push(Member::Globals(std::mem::take(globals_run)));
            }
        }

        for member in node.members {
            match member {
                MemberNode::Var(var) => {
                    self.declare(&mut symbols, &var.name);
                    globals_run.push(self.lower_global(var));
                }
                MemberNode::Function(func) => {
                    flush(&mut members, &mut globals_run);
                    self.declare(&mut symbols, &func.name);
                    members.push(Member::Function(self.lower_function(func)));
                }
                MemberNode::Init(init) => {
                    flush(&mut members, &mut globals_run);
                    let func_name = init_tag(&name, init_ordinal);
                    init_ordinal += 1;
                    members.push(Member::Function(self.lower_init(func_name.clone(), init)));
                    init_calls.push(func_name);
                }
                MemberNode::TypeDecl(decl) if decl.alias => {
                    // resolved away; the table was built in the first pass
                    self.declare(&mut symbols, &decl.name);
                }
                MemberNode::TypeDecl(decl) => {
                    flush(&mut members, &mut globals_run);
                    self.declare(&mut symbols, &decl.name);
                    members.push(Member::Struct(self.lower_struct(decl)));
                }
                MemberNode::Native(native) => {
                    flush(&mut members, &mut globals_run);
                    self.declare(&mut symbols, &native.name);
                    members.push(Member::Native(self.lower_native(native)));
                }
                MemberNode::Uses(uses) => {
                    if kind != ContainerKind::Library {
                        self.errors.uses_outside_library(uses.pos);
                    } else {
                        requires.push(Requirement {
                            name: uses.name.value,
                            optional: uses.optional,
                        });
                    }
                }
                MemberNode::Nested(nested) => {
                    flush(&mut members, &mut globals_run);
                    members.push(Member::Scope(self.lower_container(
                        path,
                        anon_ordinal,
                        nested,
                    )));
                }
            }
        }
        flush(&mut members, &mut globals_run);

        // the leading globals block is always rendered, even when empty
        if !matches!(members.first(), Some(Member::Globals(..))) {
            members.insert(0, Member::Globals(Vec::default()));
        }

        let initializer = if init_calls.is_empty() {
            None
        } else {
            Some(Initializer {
                name: String::from(INITIALIZER_NAME),
                calls: init_calls,
            })
        };

        Container {
            pos: node.pos,
            kind,
            name,
            requires,
            members,
            initializer,
        }
    }

    fn declare(&self, symbols: &mut IndexMap<String, Pos>, name: &Token) {
        if symbols.contains_key(&name.value) {
            self.errors.redeclared_symbol(name.pos, &name.value);
        } else {
            symbols.insert(name.value.clone(), name.pos);
        }
    }

    fn lower_global(&self, node: VarNode) -> GlobalVar {
        let visibility = visibility_of(node.modifier);
        let ty = self.aliases.resolve(&node.ty.value);
        let pos = node.pos;
        let name = node.name.value;

        match node.init {
            VarInit::None => GlobalVar {
                pos,
                name,
                ty,
                visibility,
                constant: false,
                array: node.array,
                hashtable: false,
                init: None,
            },
            VarInit::Mutable(expr) => GlobalVar {
                pos,
                name,
                ty,
                visibility,
                constant: false,
                array: false,
                hashtable: false,
                init: Some(expr),
            },
            VarInit::Constant(expr) => GlobalVar {
                pos,
                name,
                ty,
                visibility,
                constant: true,
                array: false,
                hashtable: false,
                init: Some(expr),
            },
            VarInit::Array => GlobalVar {
                pos,
                name,
                ty,
                visibility,
                constant: false,
                array: true,
                hashtable: false,
                init: None,
            },
            VarInit::Hashtable => GlobalVar {
                pos,
                name,
                ty,
                visibility,
                constant: true,
                array: false,
                hashtable: true,
                init: None,
            },
        }
    }

    fn lower_function(&self, node: FunctionNode) -> Function {
        let params: Vec<Param> = node
            .params
            .into_iter()
            .map(|param| Param {
                ty: self.aliases.resolve(&param.ty.value),
                name: param.name.value,
            })
            .collect();
        let return_type = node
            .return_type
            .map(|tok| self.aliases.resolve(&tok.value));

        let (locals, body) = hoist_body(self.errors, &self.aliases, &params, node.body);

        Function {
            pos: node.pos,
            name: node.name.value,
            visibility: visibility_of(node.modifier),
            params,
            return_type,
            locals,
            body,
        }
    }

    fn lower_init(&self, name: String, node: InitNode) -> Function {
        let (locals, body) = hoist_body(self.errors, &self.aliases, &[], node.body);
        Function {
            pos: node.pos,
            name,
            visibility: Visibility::Private,
            params: Vec::default(),
            return_type: None,
            locals,
            body,
        }
    }

    fn lower_struct(&self, node: TypeDeclNode) -> StructDecl {
        StructDecl {
            name: node.name.value,
            visibility: visibility_of(node.modifier),
            extends_array: node.base.value != "handle",
        }
    }

    fn lower_native(&self, node: NativeNode) -> NativeDecl {
        NativeDecl {
            name: node.name.value,
            visibility: visibility_of(node.modifier),
            params: node
                .params
                .into_iter()
                .map(|param| Param {
                    ty: self.aliases.resolve(&param.ty.value),
                    name: param.name.value,
                })
                .collect(),
            return_type: node
                .return_type
                .map(|tok| self.aliases.resolve(&tok.value)),
        }
    }
}

fn visibility_of(modifier: Option<Modifier>) -> Visibility {
    match modifier {
        None => Visibility::Private,
        Some(Modifier::Global) => Visibility::Global,
        Some(Modifier::Api) => Visibility::Api,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Statement;
    use vjassp_syntax::{parse, ErrorManager, FileManager};

    fn lower_source(source: &str) -> (Program, ErrorManager) {
        let errors = ErrorManager::default();
        let mut files = FileManager::default();
        let file = files.add_file("main.jp".into(), source.into());
        let unit = parse(&errors, &file);
        let program = lower(&errors, vec![(PathBuf::from("main.jp"), unit)]);
        (program, errors)
    }

    fn only_functions(container: &Container) -> Vec<&Function> {
        container
            .members
            .iter()
            .filter_map(|member| match member {
                Member::Function(func) => Some(func),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn init_block_becomes_named_function_with_oninit() {
        let source = "\
library Foo:
    init:
        int i = 1
";
        let (program, errors) = lower_source(source);
        assert!(!errors.has_errors());

        let container = &program.containers[0];
        let funcs = only_functions(container);
        assert_eq!(funcs.len(), 1);
        assert!(funcs[0].name.starts_with("VJPI"));
        assert_eq!(funcs[0].visibility, Visibility::Private);
        assert_eq!(funcs[0].locals.len(), 1);
        assert_eq!(funcs[0].locals[0].ty, "integer");
        assert!(funcs[0].locals[0].init.is_some());

        let initializer = container.initializer.as_ref().unwrap();
        assert_eq!(initializer.name, "onInit");
        assert_eq!(initializer.calls, vec![funcs[0].name.clone()]);
    }

    #[test]
    fn synthetic_names_are_stable_across_runs() {
        let source = "\
content:
    init:
        Foo()
content:
    init:
        Bar()
";
        let (first, _) = lower_source(source);
        let (second, _) = lower_source(source);

        let first_names: Vec<&String> = first.containers.iter().map(|c| &c.name).collect();
        let second_names: Vec<&String> = second.containers.iter().map(|c| &c.name).collect();
        assert_eq!(first_names, second_names);
        assert_ne!(first.containers[0].name, first.containers[1].name);
        assert!(first.containers[0].name.starts_with("VJPS"));
    }

    #[test]
    fn interleaved_locals_hoist_and_keep_assignment_order() {
        let source = "\
library Hoist:
    Work():
        int a = 1
        Step(a)
        int b = 2
        Step(b)
        int c = 3
        Step(c)
";
        let (program, errors) = lower_source(source);
        assert!(!errors.has_errors());

        let funcs = only_functions(&program.containers[0]);
        let work = funcs[0];
        let local_names: Vec<&str> = work.locals.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(local_names, vec!["a", "b", "c"]);

        // `a` led the body and keeps its value inline; b and c were split
        assert!(work.locals[0].init.is_some());
        assert!(work.locals[1].init.is_none());
        assert!(work.locals[2].init.is_none());

        let assigns: Vec<bool> = work
            .body
            .iter()
            .map(|stmt| matches!(stmt, Statement::Assign { .. }))
            .collect();
        assert_eq!(assigns, vec![false, true, false, true, false]);
    }

    #[test]
    fn duplicate_local_is_an_error() {
        let source = "\
library Dup:
    Work():
        int a = 1
        int a = 2
";
        let (_, errors) = lower_source(source);
        assert!(errors.has_errors());
    }

    #[test]
    fn duplicate_declaration_is_an_error() {
        let source = "\
library Dup:
    Work():
        return
    Work():
        return
";
        let (_, errors) = lower_source(source);
        assert!(errors.has_errors());
    }

    #[test]
    fn visibility_follows_modifier_blocks() {
        let source = "\
library Vis:
    global:
        Exported():
            return
    api:
        Published():
            return
    Hidden():
        return
";
        let (program, errors) = lower_source(source);
        assert!(!errors.has_errors());

        let funcs = only_functions(&program.containers[0]);
        assert_eq!(funcs[0].visibility, Visibility::Global);
        assert_eq!(funcs[1].visibility, Visibility::Api);
        assert_eq!(funcs[2].visibility, Visibility::Private);
    }

    #[test]
    fn aliases_resolve_transitively() {
        let source = "\
library Alias:
    alias ticks extends int
    Wait(ticks t) -> ticks:
        return t
";
        let (program, errors) = lower_source(source);
        assert!(!errors.has_errors());

        let funcs = only_functions(&program.containers[0]);
        assert_eq!(funcs[0].params[0].ty, "integer");
        assert_eq!(funcs[0].return_type.as_deref(), Some("integer"));
    }

    #[test]
    fn alias_cycle_is_an_error() {
        let source = "\
library Cycle:
    alias a extends b
    alias b extends a
";
        let (_, errors) = lower_source(source);
        assert!(errors.has_errors());
    }

    #[test]
    fn leading_globals_block_always_exists() {
        let source = "\
library Empty:
    init:
        Foo()
";
        let (program, errors) = lower_source(source);
        assert!(!errors.has_errors());

        let container = &program.containers[0];
        let Member::Globals(globals) = &container.members[0] else {
            panic!("expected a leading globals block");
        };
        assert!(globals.is_empty());
    }

    #[test]
    fn globals_runs_split_around_functions() {
        let source = "\
library Runs:
    int a = 1
    F():
        return
    int b = 2
    int c = 3
";
        let (program, errors) = lower_source(source);
        assert!(!errors.has_errors());

        let container = &program.containers[0];
        let shapes: Vec<&str> = container
            .members
            .iter()
            .map(|member| match member {
                Member::Globals(..) => "globals",
                Member::Function(..) => "function",
                _ => "other",
            })
            .collect();
        assert_eq!(shapes, vec!["globals", "function", "globals"]);

        let Member::Globals(second) = &container.members[2] else {
            unreachable!();
        };
        assert_eq!(second.len(), 2);
    }

    #[test]
    fn system_container_requires_the_shared_library() {
        let source = "\
library Core:
    init:
        Boot()
system Spawner:
    init:
        Start()
";
        let (program, errors) = lower_source(source);
        assert!(!errors.has_errors());
        assert!(program.has_systems);
        assert_eq!(program.libraries, vec!["Core"]);

        let system = &program.containers[1];
        assert_eq!(system.kind, ContainerKind::Library);
        assert_eq!(system.requires[0].name, "VJPLIBS");
    }

    #[test]
    fn multiple_init_blocks_call_in_source_order() {
        let source = "\
library Multi:
    init:
        First()
    init:
        Second()
";
        let (program, errors) = lower_source(source);
        assert!(!errors.has_errors());

        let container = &program.containers[0];
        let initializer = container.initializer.as_ref().unwrap();
        assert_eq!(initializer.calls.len(), 2);
        let funcs = only_functions(container);
        assert_eq!(initializer.calls[0], funcs[0].name);
        assert_eq!(initializer.calls[1], funcs[1].name);
        assert_ne!(initializer.calls[0], initializer.calls[1]);
    }

    #[test]
    fn hashtable_global_is_constant() {
        let source = "\
library Tables:
    hashtable t = {}
";
        let (program, errors) = lower_source(source);
        assert!(!errors.has_errors());

        let Member::Globals(globals) = &program.containers[0].members[0] else {
            panic!("expected globals");
        };
        assert!(globals[0].constant);
        assert!(globals[0].hashtable);
    }
}
