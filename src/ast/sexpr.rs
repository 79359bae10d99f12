use crate::ast::*;

/// Renders a tree as nested s-expressions. Names and literals are printed
/// from `source`, so the formatter must be given the text the tree was
/// parsed from.
pub struct SExprFormatter<'src> {
    source: &'src [u8],
    output: String,
    indent: usize,
}

impl<'src> SExprFormatter<'src> {
    pub fn new(source: &'src [u8]) -> Self {
        Self { source, output: String::new(), indent: 0 }
    }

    pub fn finish(self) -> String {
        self.output
    }

    fn write(&mut self, s: &str) {
        self.output.push_str(s);
    }

    fn write_span(&mut self, span: Span) {
        let end = span.end.min(self.source.len());
        let start = span.start.min(end);
        let text = String::from_utf8_lossy(&self.source[start..end]).into_owned();
        self.output.push_str(&text);
    }

    fn newline(&mut self) {
        self.output.push('\n');
        for _ in 0..self.indent {
            self.output.push_str("  ");
        }
    }

    fn block(&mut self, label: &str, statements: &[StmtId<'_>]) {
        self.newline();
        self.write("(");
        self.write(label);
        self.indent += 1;
        for stmt in statements {
            self.newline();
            self.format_stmt(stmt);
        }
        self.indent -= 1;
        self.write(")");
    }

    fn name(&mut self, name: &Name<'_>) {
        self.write_span(name.span);
    }

    fn exprs(&mut self, exprs: &[ExprId<'_>]) {
        for expr in exprs {
            self.write(" ");
            self.format_expr(expr);
        }
    }

    fn args(&mut self, args: &[Arg<'_>]) {
        self.write(" (args");
        for arg in args {
            self.write(" ");
            if let Some(name) = arg.name {
                self.write_span(name.span);
                self.write(": ");
            }
            if arg.unpack {
                self.write("...");
            }
            self.format_expr(arg.value);
        }
        self.write(")");
    }

    fn params(&mut self, params: &[Param<'_>]) {
        self.write(" (params");
        for param in params {
            self.write(" ");
            if param.variadic {
                self.write("...");
            }
            if param.by_ref {
                self.write("&");
            }
            self.write_span(param.name.span);
        }
        self.write(")");
    }

    pub fn format_program(&mut self, program: &Program<'_>) {
        self.write("(program");
        self.indent += 1;
        for stmt in program.statements {
            self.newline();
            self.format_stmt(stmt);
        }
        self.indent -= 1;
        self.write(")");
    }

    pub fn format_stmt(&mut self, stmt: StmtId<'_>) {
        match stmt {
            Stmt::Block { statements, .. } => {
                self.write("(block");
                self.indent += 1;
                for stmt in *statements {
                    self.newline();
                    self.format_stmt(stmt);
                }
                self.indent -= 1;
                self.write(")");
            }
            Stmt::If { condition, then_block, else_block, .. } => {
                self.write("(if ");
                self.format_expr(condition);
                self.indent += 1;
                self.block("then", then_block);
                if let Some(else_block) = else_block {
                    self.block("else", else_block);
                }
                self.indent -= 1;
                self.write(")");
            }
            Stmt::While { condition, body, .. } => {
                self.write("(while ");
                self.format_expr(condition);
                self.indent += 1;
                self.block("body", body);
                self.indent -= 1;
                self.write(")");
            }
            Stmt::DoWhile { body, condition, .. } => {
                self.write("(do-while ");
                self.format_expr(condition);
                self.indent += 1;
                self.block("body", body);
                self.indent -= 1;
                self.write(")");
            }
            Stmt::For { init, condition, step, body, .. } => {
                self.write("(for (init");
                self.exprs(init);
                self.write(") (cond");
                self.exprs(condition);
                self.write(") (step");
                self.exprs(step);
                self.write(")");
                self.indent += 1;
                self.block("body", body);
                self.indent -= 1;
                self.write(")");
            }
            Stmt::Foreach { expr, key_var, value_var, by_ref, body, .. } => {
                self.write("(foreach ");
                self.format_expr(expr);
                if let Some(key) = key_var {
                    self.write(" ");
                    self.format_expr(key);
                }
                self.write(if *by_ref { " &" } else { " " });
                self.format_expr(value_var);
                self.indent += 1;
                self.block("body", body);
                self.indent -= 1;
                self.write(")");
            }
            Stmt::Switch { condition, cases, .. } => {
                self.write("(switch ");
                self.format_expr(condition);
                self.indent += 1;
                for case in *cases {
                    self.newline();
                    match case.condition {
                        Some(condition) => {
                            self.write("(case ");
                            self.format_expr(condition);
                        }
                        None => self.write("(default"),
                    }
                    self.indent += 1;
                    for stmt in case.body {
                        self.newline();
                        self.format_stmt(stmt);
                    }
                    self.indent -= 1;
                    self.write(")");
                }
                self.indent -= 1;
                self.write(")");
            }
            Stmt::Break { level, .. } | Stmt::Continue { level, .. } => {
                self.write(if matches!(stmt, Stmt::Break { .. }) { "(break" } else { "(continue" });
                if let Some(level) = level {
                    self.write(" ");
                    self.format_expr(level);
                }
                self.write(")");
            }
            Stmt::Function { name, by_ref, params, body, .. } => {
                self.write("(function ");
                if *by_ref {
                    self.write("&");
                }
                self.write_span(name.span);
                self.params(params);
                self.indent += 1;
                self.block("body", body);
                self.indent -= 1;
                self.write(")");
            }
            Stmt::Class { kind, name, extends, implements, members, .. } => {
                self.write(match kind {
                    ClassKind::Class => "(class ",
                    ClassKind::Interface => "(interface ",
                    ClassKind::Trait => "(trait ",
                    ClassKind::Enum => "(enum ",
                });
                self.write_span(name.span);
                for parent in *extends {
                    self.write(" (extends ");
                    self.name(parent);
                    self.write(")");
                }
                for iface in *implements {
                    self.write(" (implements ");
                    self.name(iface);
                    self.write(")");
                }
                self.members(members);
                self.write(")");
            }
            Stmt::Namespace { name, body, .. } => {
                self.write("(namespace");
                if let Some(name) = name {
                    self.write(" ");
                    self.name(name);
                }
                self.indent += 1;
                for stmt in *body {
                    self.newline();
                    self.format_stmt(stmt);
                }
                self.indent -= 1;
                self.write(")");
            }
            Stmt::Use { kind, uses, .. } => {
                self.write(match kind {
                    UseKind::Normal => "(use",
                    UseKind::Function => "(use-function",
                    UseKind::Const => "(use-const",
                });
                for item in *uses {
                    self.write(" ");
                    self.name(&item.name);
                    if let Some(alias) = item.alias {
                        self.write(" as ");
                        self.write_span(alias.span);
                    }
                }
                self.write(")");
            }
            Stmt::Const { consts, .. } => {
                self.write("(const");
                for item in *consts {
                    self.write(" (");
                    self.write_span(item.name.span);
                    self.write(" ");
                    self.format_expr(item.value);
                    self.write(")");
                }
                self.write(")");
            }
            Stmt::Global { vars, .. } => {
                self.write("(global");
                self.exprs(vars);
                self.write(")");
            }
            Stmt::Static { vars, .. } => {
                self.write("(static");
                for var in *vars {
                    self.write(" ");
                    self.write_span(var.var.span);
                }
                self.write(")");
            }
            Stmt::Unset { vars, .. } => {
                self.write("(unset");
                self.exprs(vars);
                self.write(")");
            }
            Stmt::Try { body, catches, finally, .. } => {
                self.write("(try");
                self.indent += 1;
                self.block("body", body);
                for catch in *catches {
                    self.newline();
                    self.write("(catch");
                    for ty in catch.types {
                        self.write(" ");
                        self.name(ty);
                    }
                    self.indent += 1;
                    for stmt in catch.body {
                        self.newline();
                        self.format_stmt(stmt);
                    }
                    self.indent -= 1;
                    self.write(")");
                }
                if let Some(finally) = finally {
                    self.block("finally", finally);
                }
                self.indent -= 1;
                self.write(")");
            }
            Stmt::Throw { expr, .. } => {
                self.write("(throw ");
                self.format_expr(expr);
                self.write(")");
            }
            Stmt::Declare { declares, body, .. } => {
                self.write("(declare");
                for item in *declares {
                    self.write(" (");
                    self.write_span(item.key.span);
                    self.write(" ");
                    self.format_expr(item.value);
                    self.write(")");
                }
                if !body.is_empty() {
                    self.indent += 1;
                    self.block("body", body);
                    self.indent -= 1;
                }
                self.write(")");
            }
            Stmt::Goto { label, .. } => {
                self.write("(goto ");
                self.write_span(label.span);
                self.write(")");
            }
            Stmt::Label { name, .. } => {
                self.write("(label ");
                self.write_span(name.span);
                self.write(")");
            }
            Stmt::Echo { exprs, .. } => {
                self.write("(echo");
                self.exprs(exprs);
                self.write(")");
            }
            Stmt::Return { expr, .. } => {
                self.write("(return");
                if let Some(expr) = expr {
                    self.write(" ");
                    self.format_expr(expr);
                }
                self.write(")");
            }
            Stmt::Expression { expr, .. } => self.format_expr(expr),
            Stmt::HaltCompiler { .. } => self.write("(halt-compiler)"),
            Stmt::InlineHtml { .. } => self.write("(inline-html)"),
            Stmt::Nop { .. } => self.write("(nop)"),
            Stmt::Error { span } => {
                self.write(&format!("(error {}..{})", span.start, span.end));
            }
        }
    }

    fn members(&mut self, members: &[ClassMember<'_>]) {
        self.indent += 1;
        for member in members {
            self.newline();
            match member {
                ClassMember::Property { name, .. } => {
                    self.write("(property ");
                    self.write_span(name.span);
                    self.write(")");
                }
                ClassMember::Method { name, params, body, .. } => {
                    self.write("(method ");
                    self.write_span(name.span);
                    self.params(params);
                    if let Some(body) = body {
                        self.indent += 1;
                        self.block("body", body);
                        self.indent -= 1;
                    }
                    self.write(")");
                }
                ClassMember::Const { consts, .. } => {
                    self.write("(const");
                    for item in *consts {
                        self.write(" ");
                        self.write_span(item.name.span);
                    }
                    self.write(")");
                }
                ClassMember::TraitUse { traits, .. } => {
                    self.write("(use");
                    for name in *traits {
                        self.write(" ");
                        self.name(name);
                    }
                    self.write(")");
                }
                ClassMember::Case { name, .. } => {
                    self.write("(case ");
                    self.write_span(name.span);
                    self.write(")");
                }
                ClassMember::Error { span } => {
                    self.write(&format!("(error {}..{})", span.start, span.end));
                }
            }
        }
        self.indent -= 1;
    }

    pub fn format_expr(&mut self, expr: ExprId<'_>) {
        match expr {
            Expr::Assign { var, expr, .. } => {
                self.write("(assign ");
                self.format_expr(var);
                self.write(" ");
                self.format_expr(expr);
                self.write(")");
            }
            Expr::AssignRef { var, expr, .. } => {
                self.write("(assign-ref ");
                self.format_expr(var);
                self.write(" ");
                self.format_expr(expr);
                self.write(")");
            }
            Expr::AssignOp { var, op, expr, .. } => {
                self.write(&format!("(assign-op {:?} ", op));
                self.format_expr(var);
                self.write(" ");
                self.format_expr(expr);
                self.write(")");
            }
            Expr::Binary { left, op, right, .. } => {
                self.write("(");
                self.write(binary_op_text(*op));
                self.write(" ");
                self.format_expr(left);
                self.write(" ");
                self.format_expr(right);
                self.write(")");
            }
            Expr::Unary { op, expr, .. } => {
                self.write(match op {
                    UnaryOp::Plus => "(+ ",
                    UnaryOp::Minus => "(- ",
                    UnaryOp::Not => "(! ",
                    UnaryOp::BitNot => "(~ ",
                    UnaryOp::Reference => "(& ",
                });
                self.format_expr(expr);
                self.write(")");
            }
            Expr::PreInc { var, .. } => self.wrap("pre-inc", var),
            Expr::PreDec { var, .. } => self.wrap("pre-dec", var),
            Expr::PostInc { var, .. } => self.wrap("post-inc", var),
            Expr::PostDec { var, .. } => self.wrap("post-dec", var),
            Expr::Ternary { condition, if_true, if_false, .. } => {
                self.write("(ternary ");
                self.format_expr(condition);
                if let Some(if_true) = if_true {
                    self.write(" ");
                    self.format_expr(if_true);
                }
                self.write(" ");
                self.format_expr(if_false);
                self.write(")");
            }
            Expr::Cast { kind, expr, .. } => {
                self.write(&format!("(cast {:?} ", kind));
                self.format_expr(expr);
                self.write(")");
            }
            Expr::Call { func, args, .. } => {
                self.write("(call ");
                self.format_expr(func);
                self.args(args);
                self.write(")");
            }
            Expr::MethodCall { target, method, args, nullsafe, .. } => {
                self.write(if *nullsafe { "(nullsafe-method-call " } else { "(method-call " });
                self.format_expr(target);
                self.write(" ");
                self.format_expr(method);
                self.args(args);
                self.write(")");
            }
            Expr::StaticCall { class, method, args, .. } => {
                self.write("(static-call ");
                self.format_expr(class);
                self.write(" ");
                self.format_expr(method);
                self.args(args);
                self.write(")");
            }
            Expr::PropertyFetch { target, property, nullsafe, .. } => {
                self.write(if *nullsafe { "(nullsafe-prop " } else { "(prop " });
                self.format_expr(target);
                self.write(" ");
                self.format_expr(property);
                self.write(")");
            }
            Expr::StaticPropertyFetch { class, property, .. } => {
                self.write("(static-prop ");
                self.format_expr(class);
                self.write(" ");
                self.format_expr(property);
                self.write(")");
            }
            Expr::ClassConstFetch { class, constant, .. } => {
                self.write("(class-const ");
                self.format_expr(class);
                self.write(" ");
                self.format_expr(constant);
                self.write(")");
            }
            Expr::ArrayDimFetch { array, dim, .. } => {
                self.write("(dim ");
                self.format_expr(array);
                if let Some(dim) = dim {
                    self.write(" ");
                    self.format_expr(dim);
                }
                self.write(")");
            }
            Expr::New { class, args, .. } => {
                self.write("(new ");
                self.format_expr(class);
                self.args(args);
                self.write(")");
            }
            Expr::AnonymousClass { args, members, .. } => {
                self.write("(new-anonymous-class");
                self.args(args);
                self.members(members);
                self.write(")");
            }
            Expr::Clone { expr, .. } => self.wrap("clone", expr),
            Expr::Closure { is_static, params, body, .. } => {
                self.write(if *is_static { "(static-closure" } else { "(closure" });
                self.params(params);
                self.indent += 1;
                self.block("body", body);
                self.indent -= 1;
                self.write(")");
            }
            Expr::ArrowFunction { is_static, params, expr, .. } => {
                self.write(if *is_static { "(static-fn" } else { "(fn" });
                self.params(params);
                self.write(" ");
                self.format_expr(expr);
                self.write(")");
            }
            Expr::Match { condition, arms, .. } => {
                self.write("(match ");
                self.format_expr(condition);
                for arm in *arms {
                    self.write(" (arm");
                    match arm.conditions {
                        Some(conditions) => self.exprs(conditions),
                        None => self.write(" default"),
                    }
                    self.write(" ");
                    self.format_expr(arm.body);
                    self.write(")");
                }
                self.write(")");
            }
            Expr::Isset { vars, .. } => {
                self.write("(isset");
                self.exprs(vars);
                self.write(")");
            }
            Expr::Empty { expr, .. } => self.wrap("empty", expr),
            Expr::Include { kind, expr, .. } => {
                let label = match kind {
                    IncludeKind::Include => "include",
                    IncludeKind::IncludeOnce => "include_once",
                    IncludeKind::Require => "require",
                    IncludeKind::RequireOnce => "require_once",
                };
                self.wrap(label, expr);
            }
            Expr::Eval { expr, .. } => self.wrap("eval", expr),
            Expr::Exit { expr, .. } => {
                self.write("(exit");
                if let Some(expr) = expr {
                    self.write(" ");
                    self.format_expr(expr);
                }
                self.write(")");
            }
            Expr::Print { expr, .. } => self.wrap("print", expr),
            Expr::Yield { key, value, .. } => {
                self.write("(yield");
                if let Some(key) = key {
                    self.write(" ");
                    self.format_expr(key);
                }
                if let Some(value) = value {
                    self.write(" ");
                    self.format_expr(value);
                }
                self.write(")");
            }
            Expr::YieldFrom { expr, .. } => self.wrap("yield-from", expr),
            Expr::Throw { expr, .. } => self.wrap("throw", expr),
            Expr::Silence { expr, .. } => self.wrap("silence", expr),
            Expr::Array { items, .. } | Expr::List { items, .. } => {
                self.write(if matches!(expr, Expr::List { .. }) { "(list" } else { "(array" });
                for item in *items {
                    self.write(" ");
                    if let Some(key) = item.key {
                        self.format_expr(key);
                        self.write(" => ");
                    }
                    if item.unpack {
                        self.write("...");
                    }
                    if item.by_ref {
                        self.write("&");
                    }
                    match item.value {
                        Some(value) => self.format_expr(value),
                        None => self.write("_"),
                    }
                }
                self.write(")");
            }
            Expr::Variable { name, .. } | Expr::Identifier { name, .. } => self.write_span(*name),
            Expr::IndirectVariable { name, .. } => self.wrap("$", name),
            Expr::Name { name, .. } => self.name(name),
            Expr::Integer { value, .. } | Expr::Float { value, .. } => {
                self.write(&String::from_utf8_lossy(value));
            }
            Expr::String { value, .. } => {
                self.write(&String::from_utf8_lossy(value));
            }
            Expr::InterpolatedString { parts, .. } => {
                self.write("(interpolated");
                self.exprs(parts);
                self.write(")");
            }
            Expr::ShellExec { parts, .. } => {
                self.write("(shell");
                self.exprs(parts);
                self.write(")");
            }
            Expr::MagicConst { span, .. } => self.write_span(*span),
            Expr::Error { span } => {
                self.write(&format!("(error {}..{})", span.start, span.end));
            }
        }
    }

    fn wrap(&mut self, label: &str, expr: ExprId<'_>) {
        self.write("(");
        self.write(label);
        self.write(" ");
        self.format_expr(expr);
        self.write(")");
    }
}

fn binary_op_text(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Plus => "+",
        BinaryOp::Minus => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Mod => "%",
        BinaryOp::Pow => "**",
        BinaryOp::Concat => ".",
        BinaryOp::EqEq => "==",
        BinaryOp::EqEqEq => "===",
        BinaryOp::NotEq => "!=",
        BinaryOp::NotEqEq => "!==",
        BinaryOp::Lt => "<",
        BinaryOp::LtEq => "<=",
        BinaryOp::Gt => ">",
        BinaryOp::GtEq => ">=",
        BinaryOp::Spaceship => "<=>",
        BinaryOp::And => "&&",
        BinaryOp::Or => "||",
        BinaryOp::BitAnd => "&",
        BinaryOp::BitOr => "|",
        BinaryOp::BitXor => "^",
        BinaryOp::ShiftLeft => "<<",
        BinaryOp::ShiftRight => ">>",
        BinaryOp::LogicalAnd => "and",
        BinaryOp::LogicalOr => "or",
        BinaryOp::LogicalXor => "xor",
        BinaryOp::Coalesce => "??",
        BinaryOp::Instanceof => "instanceof",
    }
}
