//! Reachable-function pruning (spec §4.2, §8 testable property 3).
//!
//! Functions unreachable from `main` are never translated or emitted —
//! dropping them can't change observable behavior, and it keeps dead
//! code out of the SSA optimizer's reach.

use crate::ast::Program;
use std::collections::{HashMap, HashSet};

/// Which functions call which others, built once from the checked AST.
#[derive(Debug, Clone)]
pub struct CallGraph {
    edges: HashMap<String, HashSet<String>>,
}

impl CallGraph {
    pub fn build(program: &Program) -> Self {
        let mut edges = HashMap::new();
        for f in &program.functions {
            let mut callees = HashSet::new();
            if let crate::ast::FunDef::User { body, .. } = f {
                body.called_functions(&mut callees);
            }
            edges.insert(f.name().to_string(), callees);
        }
        CallGraph { edges }
    }

    /// The transitive closure of functions reachable from `main`,
    /// including `main` itself.
    pub fn reachable_from_main(&self) -> HashSet<String> {
        let mut reachable = HashSet::new();
        let mut worklist = vec!["main".to_string()];
        reachable.insert("main".to_string());
        while let Some(name) = worklist.pop() {
            let Some(callees) = self.edges.get(&name) else {
                continue;
            };
            for callee in callees {
                if reachable.insert(callee.clone()) {
                    worklist.push(callee.clone());
                }
            }
        }
        reachable
    }
}

/// Drops every function not reachable from `main`, preserving order.
pub fn prune_unreachable(program: &mut Program) {
    let reachable = CallGraph::build(program).reachable_from_main();
    program.functions.retain(|f| reachable.contains(f.name()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{FunDef, Stmt};
    use crate::types::Type;

    fn user_fn(name: &str, calls: &str) -> FunDef {
        let body = if calls.is_empty() {
            Stmt::Block {
                stmts: vec![Stmt::VoidReturn { line: 1 }],
                returns: true,
            }
        } else {
            Stmt::Block {
                stmts: vec![
                    Stmt::ExprStmt {
                        value: crate::ast::Expr::Call {
                            callee: calls.to_string(),
                            args: vec![],
                            ty: Some(Type::Void),
                            line: 1,
                        },
                        line: 1,
                    },
                    Stmt::VoidReturn { line: 1 },
                ],
                returns: true,
            }
        };
        FunDef::User {
            name: name.to_string(),
            params: vec![],
            ret: Type::Void,
            body,
            line: 1,
        }
    }

    #[test]
    fn prunes_functions_unreachable_from_main() {
        let mut program = Program {
            functions: vec![
                user_fn("main", "helper"),
                user_fn("helper", ""),
                user_fn("dead", ""),
            ],
        };
        prune_unreachable(&mut program);
        let names: Vec<&str> = program.functions.iter().map(|f| f.name()).collect();
        assert!(names.contains(&"main"));
        assert!(names.contains(&"helper"));
        assert!(!names.contains(&"dead"));
    }

    #[test]
    fn transitive_reachability_follows_chains() {
        let mut program = Program {
            functions: vec![
                user_fn("main", "a"),
                user_fn("a", "b"),
                user_fn("b", ""),
                user_fn("unreached", ""),
            ],
        };
        prune_unreachable(&mut program);
        let names: Vec<&str> = program.functions.iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["main", "a", "b"]);
    }
}
