//! Hand-built fixture trees for tests, grounded on the teacher's
//! `test_fixtures.rs`/`test_harness.rs` pattern of constructing small ASTs
//! directly rather than driving a real parser (out of scope, crate docs §1).

use super::{AssignableTok, Arena, BaseTok, FunctionBody, FunctionDefNode, Node, NodeId, TypeRef};

/// A small, ergonomic builder over [`Arena`] for constructing fixture
/// function bodies in tests.
#[derive(Default)]
pub struct Builder {
    pub arena: Arena,
}

impl Builder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `name` as a bare variable reference, wrapped as a one-token
    /// base-assignable `Assignables` node.
    pub fn var(&mut self, name: &str) -> NodeId {
        self.base_seq(vec![BaseTok::Var(name.to_string())])
    }

    /// A literal constant (numeric/string/bool lexeme), as written in
    /// source, wrapped as an `Assignables` node.
    pub fn constant(&mut self, lexeme: &str) -> NodeId {
        self.base_seq(vec![BaseTok::Constant(lexeme.to_string())])
    }

    /// `callee(args...)` where `callee` is a bare name resolved in scope.
    pub fn call(&mut self, callee: &str, args: Vec<NodeId>) -> NodeId {
        self.base_seq(vec![BaseTok::Var(callee.to_string()), BaseTok::Call(args)])
    }

    /// `recv.field` dotted access.
    pub fn field_access(&mut self, recv: &str, field: &str) -> NodeId {
        self.base_seq(vec![
            BaseTok::Var(recv.to_string()),
            BaseTok::Dot,
            BaseTok::Var(field.to_string()),
        ])
    }

    /// `recv.method(args...)` method-style call (`f(recv, args...)` at
    /// lowering time).
    pub fn method_call(&mut self, recv: &str, method: &str, args: Vec<NodeId>) -> NodeId {
        self.base_seq(vec![
            BaseTok::Var(recv.to_string()),
            BaseTok::Dot,
            BaseTok::Var(method.to_string()),
            BaseTok::Call(args),
        ])
    }

    /// A raw sequence of base-assignable tokens, wrapped as one
    /// `Assignables` node containing a single `Base` group.
    pub fn base_seq(&mut self, toks: Vec<BaseTok>) -> NodeId {
        self.arena
            .alloc(Node::Assignables(vec![AssignableTok::Base(toks)]), None)
    }

    /// `lhs <op> rhs`, an infix binary expression.
    pub fn binop(&mut self, lhs: NodeId, op: &str, rhs: NodeId) -> NodeId {
        let lhs_toks = self.unwrap_base(lhs);
        let rhs_toks = self.unwrap_base(rhs);
        self.arena.alloc(
            Node::Assignables(vec![
                AssignableTok::Base(lhs_toks),
                AssignableTok::Operator(op.to_string()),
                AssignableTok::Base(rhs_toks),
            ]),
            None,
        )
    }

    /// `<op> rhs`, a prefix unary expression.
    pub fn prefix(&mut self, op: &str, rhs: NodeId) -> NodeId {
        let rhs_toks = self.unwrap_base(rhs);
        self.arena.alloc(
            Node::Assignables(vec![
                AssignableTok::Operator(op.to_string()),
                AssignableTok::Base(rhs_toks),
            ]),
            None,
        )
    }

    fn unwrap_base(&self, id: NodeId) -> Vec<BaseTok> {
        match self.arena.get(id) {
            Node::Assignables(toks) if toks.len() == 1 => match &toks[0] {
                AssignableTok::Base(b) => b.clone(),
                AssignableTok::Operator(_) => panic!("expected a base-assignable sequence"),
            },
            _ => panic!("expected a single-token assignables node"),
        }
    }

    pub fn object_literal(
        &mut self,
        type_name: Option<&str>,
        fields: Vec<(&str, NodeId)>,
    ) -> NodeId {
        self.base_seq(vec![BaseTok::ObjectLiteral {
            type_name: type_name.map(str::to_string),
            fields: fields.into_iter().map(|(n, v)| (n.to_string(), v)).collect(),
        }])
    }

    pub fn array_literal(&mut self, type_name: Option<&str>, elements: Vec<NodeId>) -> NodeId {
        self.base_seq(vec![BaseTok::ArrayLiteral {
            type_name: type_name.map(str::to_string),
            elements,
        }])
    }

    pub fn const_decl(&mut self, name: &str, type_ann: Option<TypeRef>, value: NodeId) -> NodeId {
        self.arena.alloc(
            Node::ConstDecl {
                name: name.to_string(),
                type_ann,
                value,
            },
            None,
        )
    }

    pub fn let_decl(&mut self, name: &str, type_ann: Option<TypeRef>, value: NodeId) -> NodeId {
        self.arena.alloc(
            Node::LetDecl {
                name: name.to_string(),
                type_ann,
                value,
            },
            None,
        )
    }

    pub fn assignment(&mut self, path: Vec<&str>, value: NodeId) -> NodeId {
        self.arena.alloc(
            Node::Assignment {
                path: path.into_iter().map(str::to_string).collect(),
                value,
            },
            None,
        )
    }

    pub fn exit_with(&mut self, value: NodeId) -> NodeId {
        self.arena.alloc(Node::Exit(Some(value)), None)
    }

    pub fn exit_void(&mut self) -> NodeId {
        self.arena.alloc(Node::Exit(None), None)
    }

    pub fn emit(&mut self, event: &str, value: Option<NodeId>) -> NodeId {
        self.arena.alloc(
            Node::Emit {
                event: event.to_string(),
                value,
            },
            None,
        )
    }

    pub fn conditional(
        &mut self,
        branches: Vec<(NodeId, Vec<NodeId>)>,
        else_branch: Option<Vec<NodeId>>,
    ) -> NodeId {
        self.arena.alloc(
            Node::Conditional {
                branches,
                else_branch,
            },
            None,
        )
    }

    pub fn function_def(
        &mut self,
        name: Option<&str>,
        args: Vec<(&str, TypeRef)>,
        ret: Option<TypeRef>,
        body: FunctionBody,
    ) -> NodeId {
        self.arena.alloc(
            Node::FunctionDef(FunctionDefNode {
                name: name.map(str::to_string),
                args: args.into_iter().map(|(n, t)| (n.to_string(), t)).collect(),
                ret,
                body,
            }),
            None,
        )
    }

    /// Build an anonymous function literal as a `BaseTok` usable inline in
    /// a call's argument list.
    pub fn function_literal(
        &mut self,
        args: Vec<(&str, TypeRef)>,
        ret: Option<TypeRef>,
        body: FunctionBody,
    ) -> NodeId {
        let def = self.function_def(None, args, ret, body);
        self.base_seq(vec![BaseTok::FunctionLiteral(def)])
    }
}
