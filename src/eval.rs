//! Expression Evaluator: the recursive core.
//!
//! `Compiler::eval` consumes one `ast::Expr` and an accumulating assembly
//! buffer, appends to the buffer, and returns the expression's static type.
//! It drives every other module: it resolves symbols against
//! [`crate::env`], checks argument signatures through [`crate::types`],
//! tracks string ownership through [`crate::ownership`], and renders
//! fragments from [`crate::templates`].

use crate::ast::Expr;
use crate::env::{Binding, Environment};
use crate::error::CompileError;
use crate::function_table::FunctionTable;
use crate::literal_pool::LiteralPool;
use crate::ownership;
use crate::parser;
use crate::templates;
use crate::types::{check_signature, EvalType, ExpectedType, Type};

const UNARY_OPS: &[(&str, &str)] = &[("neg", "neg")];

const BINARY_OPS: &[(&str, &str)] = &[
    ("add", "addl"),
    ("sub", "subl"),
    ("mul", "imull"),
    ("band", "andl"),
    ("bor", "orl"),
    ("bxor", "xorl"),
];

const COMPARISON_OPS: &[(&str, &str)] = &[
    ("eq", "sete"),
    ("ne", "setne"),
    ("lt", "setl"),
    ("le", "setle"),
    ("gt", "setg"),
    ("ge", "setge"),
];

/// `(type, was this source argument a bare variable/parameter reference?)`.
/// The second field drives `free_arguments` (spec §4.7): a compound call
/// produces an unnamed temporary that nothing owns.
type ObservedArg = (Type, bool);

pub struct Compiler {
    env: Environment,
    literals: LiteralPool,
    functions: FunctionTable,
    unique_counter: u64,
}

impl Compiler {
    pub fn new() -> Self {
        Compiler {
            env: Environment::new(),
            literals: LiteralPool::new(),
            functions: FunctionTable::new(),
            unique_counter: 0,
        }
    }

    pub fn literals(&self) -> &LiteralPool {
        &self.literals
    }

    pub fn functions(&self) -> &FunctionTable {
        &self.functions
    }

    fn next_id(&mut self) -> u64 {
        self.unique_counter += 1;
        self.unique_counter
    }

    /// Evaluate a whole program's top-level expressions into one buffer.
    pub fn eval_program(&mut self, exprs: &[Expr]) -> Result<String, CompileError> {
        let mut asm = String::new();
        for expr in exprs {
            self.eval(expr, &mut asm)?;
        }
        Ok(asm)
    }

    pub fn eval(&mut self, expr: &Expr, asm: &mut String) -> Result<EvalType, CompileError> {
        match expr {
            Expr::Atom(s) => self.eval_atom(s, asm),
            Expr::Block(raw) => {
                self.eval_block(raw, asm)?;
                Ok(EvalType::Block)
            }
            Expr::Call { keyword, args } => self.eval_call(keyword, args, asm),
        }
    }

    fn eval_atom(&mut self, s: &str, asm: &mut String) -> Result<EvalType, CompileError> {
        if s.is_empty() {
            return Ok(EvalType::Value(Type::Undef));
        }

        if let Some((slot, ty)) = self.env.current().lookup_variable(s) {
            asm.push_str(&templates::get_local(ownership::local_offset(slot)));
            return Ok(EvalType::Value(ty));
        }

        if let Some((slot, ty)) = self.env.current().lookup_parameter(s) {
            asm.push_str(&templates::get_parameter(8 + 4 * slot as i32));
            return Ok(EvalType::Value(ty));
        }

        if is_integer_literal(s) {
            asm.push_str(&templates::literal_int(s));
            return Ok(EvalType::Value(Type::Int));
        }

        if s.len() >= 2 && s.starts_with('\'') && s.ends_with('\'') {
            let inner = &s[1..s.len() - 1];
            let label = self.literals.add(inner);
            tracing::debug!(label = %label, "registered string literal");
            asm.push_str(&templates::literal_label(&label));
            return Ok(EvalType::Value(Type::StringLit));
        }

        Err(CompileError::UndeclaredVariable {
            name: s.to_string(),
        })
    }

    fn eval_block(&mut self, raw: &str, asm: &mut String) -> Result<(), CompileError> {
        let raw = raw.trim();
        if !raw.starts_with('{') || !raw.ends_with('}') {
            return Err(CompileError::MalformedBlock {
                snippet: raw.to_string(),
            });
        }
        let inner = &raw[1..raw.len() - 1];
        let exprs = parser::parse_program(inner)?;

        self.env.current_mut().push_block();
        tracing::debug!(depth = self.env.current().block_depth(), "entered block");
        for e in &exprs {
            self.eval(e, asm)?;
        }

        let base_slot = self.env.current().flatten().len() - self.env.current().innermost_block().len();
        let exiting = self.env.current().innermost_block().clone();
        asm.push_str(&ownership::block_exit_asm(&exiting, base_slot));
        self.env.current_mut().pop_block();
        Ok(())
    }

    fn eval_call(
        &mut self,
        keyword: &str,
        args: &[Expr],
        asm: &mut String,
    ) -> Result<EvalType, CompileError> {
        match keyword {
            "var" => self.eval_var(args, asm),
            "set" => self.eval_set(args, asm),
            "block" => {
                require_arity("block", args, 1)?;
                let text = expect_block_text(&args[0], "block")?;
                self.eval_block(text, asm)?;
                Ok(EvalType::Block)
            }
            "if" => self.eval_if(args, asm),
            "while" => self.eval_while(args, asm),
            "function" => self.eval_function(args),
            "return" => self.eval_return(args, asm),
            _ => self.eval_general_call(keyword, args, asm),
        }
    }

    fn eval_var(&mut self, args: &[Expr], asm: &mut String) -> Result<EvalType, CompileError> {
        require_arity("var", args, 2)?;
        let name = atom_text(&args[0], "var")?.to_string();
        require_identifier(&name)?;

        let value_type = self.eval(&args[1], asm)?.require_value("var")?;
        if !matches!(value_type, Type::Int | Type::String | Type::StringLit) {
            return Err(CompileError::TypeMismatch {
                operator: "var".to_string(),
                position: 2,
                expected: "INT|STRING|STRING_LIT".to_string(),
                got: value_type.to_string(),
            });
        }
        asm.push_str(&templates::push_result());

        if value_type == Type::String {
            self.move_if_bare_string_identifier(&args[1]);
        }

        self.env.current_mut().declare(&name, value_type)?;
        tracing::debug!(name = %name, ty = %value_type, "declared variable");
        Ok(EvalType::Value(Type::Undef))
    }

    fn eval_set(&mut self, args: &[Expr], asm: &mut String) -> Result<EvalType, CompileError> {
        require_arity("set", args, 2)?;
        let name = atom_text(&args[0], "set")?.to_string();
        let (slot, bound_type) = self
            .env
            .current()
            .lookup_variable(&name)
            .ok_or_else(|| CompileError::UndeclaredVariable { name: name.clone() })?;

        let value_type = self.eval(&args[1], asm)?.require_value("set")?;
        if value_type != bound_type {
            return Err(CompileError::TypeMismatch {
                operator: "set".to_string(),
                position: 2,
                expected: bound_type.to_string(),
                got: value_type.to_string(),
            });
        }
        asm.push_str(&templates::push_result());

        if value_type == Type::String {
            self.move_if_bare_string_identifier(&args[1]);
            asm.push_str(&ownership::free_local_asm(slot));
        }

        asm.push_str(&templates::store_local(ownership::local_offset(slot)));
        Ok(EvalType::Value(Type::Undef))
    }

    /// `var`/`set`'s move rule: if the right-hand side was a bare identifier
    /// whose binding is (still) `STRING`, that binding's ownership has just
    /// been transferred to the new one, so retype the source to `UNDEF`.
    fn move_if_bare_string_identifier(&mut self, rhs: &Expr) {
        if let Expr::Atom(name) = rhs {
            if let Some((_, Type::String)) = self.env.current().lookup_variable(name) {
                self.env.current_mut().retype_variable(name, Type::Undef);
            }
        }
    }

    fn eval_if(&mut self, args: &[Expr], asm: &mut String) -> Result<EvalType, CompileError> {
        if args.len() != 2 && args.len() != 3 {
            return Err(CompileError::ArityMismatch {
                operator: "if".to_string(),
                expected: 2,
                got: args.len(),
            });
        }
        let id = self.next_id();

        let cond_type = self.eval(&args[0], asm)?.require_value("if")?;
        if cond_type != Type::Int {
            return Err(CompileError::ConditionNotInt {
                keyword: "if".to_string(),
            });
        }
        asm.push_str(&templates::if_start(id));

        let then_text = expect_block_text(&args[1], "if")?;
        self.eval_block(then_text, asm)?;

        asm.push_str(&templates::else_start(id));
        if args.len() == 3 {
            let else_text = expect_block_text(&args[2], "if")?;
            self.eval_block(else_text, asm)?;
        }
        asm.push_str(&templates::if_end(id));
        Ok(EvalType::Block)
    }

    fn eval_while(&mut self, args: &[Expr], asm: &mut String) -> Result<EvalType, CompileError> {
        require_arity("while", args, 2)?;
        let id = self.next_id();

        asm.push_str(&templates::while_start(id));
        let cond_type = self.eval(&args[0], asm)?.require_value("while")?;
        if cond_type != Type::Int {
            return Err(CompileError::ConditionNotInt {
                keyword: "while".to_string(),
            });
        }
        asm.push_str(&templates::while_condition(id));

        self.env.current_mut().push_loop(id);
        let body_text = expect_block_text(&args[1], "while")?;
        self.eval_block(body_text, asm)?;
        self.env.current_mut().pop_loop();

        asm.push_str(&templates::while_end(id));
        Ok(EvalType::Block)
    }

    fn eval_function(&mut self, args: &[Expr]) -> Result<EvalType, CompileError> {
        require_arity("function", args, 4)?;
        let name = atom_text(&args[0], "function")?.to_string();
        require_identifier(&name)?;

        let raw_params = atom_text(&args[1], "function")?;
        let parsed_params = parser::parse_param_list(raw_params)?;
        let mut params = Vec::with_capacity(parsed_params.len());
        for (pname, type_name) in parsed_params {
            require_identifier(&pname)?;
            let ty = Type::from_name(&type_name).ok_or_else(|| CompileError::UnknownType {
                name: type_name.clone(),
            })?;
            params.push((pname, ty));
        }

        let return_type_name = atom_text(&args[2], "function")?;
        let return_type = Type::from_name(return_type_name).ok_or_else(|| CompileError::UnknownType {
            name: return_type_name.to_string(),
        })?;

        let body_text = expect_block_text(&args[3], "function")?.to_string();

        let param_types: Vec<Type> = params.iter().map(|(_, t)| *t).collect();
        // Register before compiling the body so recursive calls resolve.
        self.functions
            .register_signature(&name, param_types, return_type);

        self.env.push_frame(&name, params, return_type);
        tracing::debug!(name = %name, "entered function frame");

        let mut body_asm = String::new();
        body_asm.push_str(&templates::function_prologue(&name));
        self.eval_block(&body_text, &mut body_asm)?;
        body_asm.push_str(&templates::function_epilogue(&name));

        self.functions.set_body(&name, body_asm);
        self.env.pop_frame();

        Ok(EvalType::Value(return_type))
    }

    fn eval_return(&mut self, args: &[Expr], asm: &mut String) -> Result<EvalType, CompileError> {
        let rtype = self.env.current().return_type;
        let fname = self.env.current().name.clone();

        let expected_arity = if rtype == Type::Undef { 0 } else { 1 };
        if args.len() != expected_arity {
            return Err(CompileError::ArityMismatch {
                operator: "return".to_string(),
                expected: expected_arity,
                got: args.len(),
            });
        }

        let returned_name: Option<String> = match args.first() {
            Some(Expr::Atom(name)) => Some(name.clone()),
            _ => None,
        };

        let flattened: Vec<Binding> = self
            .env
            .current()
            .flatten()
            .into_iter()
            .cloned()
            .collect();
        let flat_refs: Vec<&Binding> = flattened.iter().collect();
        asm.push_str(&ownership::return_free_asm(
            &flat_refs,
            returned_name.as_deref(),
        ));

        if let Some(arg) = args.first() {
            let value_type = self.eval(arg, asm)?.require_value("return")?;
            if value_type != rtype {
                return Err(CompileError::ReturnTypeMismatch {
                    function: fname,
                    expected: rtype.to_string(),
                    got: value_type.to_string(),
                });
            }
        }

        asm.push_str(&templates::return_epilogue());
        Ok(EvalType::Value(rtype))
    }

    fn eval_general_call(
        &mut self,
        keyword: &str,
        args: &[Expr],
        asm: &mut String,
    ) -> Result<EvalType, CompileError> {
        // `inc`/`dec` and loop control take their single argument literally
        // (a bare name, or nothing) rather than through the generic
        // reverse-eval-and-push pipeline below.
        if keyword == "inc" || keyword == "dec" {
            return self.eval_inc_dec(keyword, args, asm);
        }
        if keyword == "break" || keyword == "continue" {
            return self.eval_loop_control(keyword, args, asm);
        }
        if keyword == "check_overflow" {
            require_arity("check_overflow", args, 0)?;
            let id = self.next_id();
            asm.push_str(&templates::check_overflow(id));
            return Ok(EvalType::Value(Type::Int));
        }
        if keyword == "exit" {
            return self.eval_exit(args, asm);
        }
        // `println` alone among the string-sink builtins also accepts zero
        // arguments (spec §6's built-in signature table: `println` -> UNDEF
        // with no args, printing a bare newline).
        if keyword == "println" && args.is_empty() {
            asm.push_str(&templates::call_extension(keyword));
            return Ok(EvalType::Value(Type::Undef));
        }

        // Every remaining form evaluates its arguments in reverse source
        // order, pushing each result — the convention that leaves the
        // *first* source argument on top of the stack after all pushes,
        // so cleanup (free_arguments) below can walk them back in plain
        // source order.
        let mut observed_rev: Vec<ObservedArg> = Vec::with_capacity(args.len());
        for arg in args.iter().rev() {
            let is_bare_reference = matches!(arg, Expr::Atom(_));
            let ty = self.eval(arg, asm)?.require_value(keyword)?;
            asm.push_str(&templates::push_result());
            observed_rev.push((ty, is_bare_reference));
        }
        let mut observed = observed_rev;
        observed.reverse();
        let types: Vec<Type> = observed.iter().map(|(t, _)| *t).collect();

        if let Some((sig, result)) = builtin_signature(keyword) {
            check_signature(keyword, &types, sig)?;
            asm.push_str(&templates::call_extension(keyword));
            self.emit_free_arguments(&observed, asm);
            return Ok(result);
        }

        if let Some((op, mnemonic)) = UNARY_OPS.iter().find(|(name, _)| *name == keyword) {
            check_signature(keyword, &types, &[ExpectedType::Exact(Type::Int)])?;
            asm.push_str(&templates::unary_op(mnemonic));
            let _ = op;
            return Ok(EvalType::Value(Type::Int));
        }

        if keyword == "div" || keyword == "mod" {
            check_signature(
                keyword,
                &types,
                &[ExpectedType::Exact(Type::Int), ExpectedType::Exact(Type::Int)],
            )?;
            asm.push_str(if keyword == "div" {
                &templates::div_op()
            } else {
                &templates::mod_op()
            });
            return Ok(EvalType::Value(Type::Int));
        }

        if let Some((_, mnemonic)) = BINARY_OPS.iter().find(|(name, _)| *name == keyword) {
            check_signature(
                keyword,
                &types,
                &[ExpectedType::Exact(Type::Int), ExpectedType::Exact(Type::Int)],
            )?;
            asm.push_str(&templates::binary_op(mnemonic));
            return Ok(EvalType::Value(Type::Int));
        }

        if let Some((_, set_insn)) = COMPARISON_OPS.iter().find(|(name, _)| *name == keyword) {
            check_signature(
                keyword,
                &types,
                &[ExpectedType::Exact(Type::Int), ExpectedType::Exact(Type::Int)],
            )?;
            let id = self.next_id();
            asm.push_str(&templates::comparison_op(set_insn, id));
            return Ok(EvalType::Value(Type::Int));
        }

        match keyword {
            "and" | "or" => {
                check_signature(
                    keyword,
                    &types,
                    &[ExpectedType::Exact(Type::Int), ExpectedType::Exact(Type::Int)],
                )?;
                let id = self.next_id();
                asm.push_str(if keyword == "and" {
                    &templates::logical_and(id)
                } else {
                    &templates::logical_or(id)
                });
                return Ok(EvalType::Value(Type::Int));
            }
            "not" => {
                check_signature(keyword, &types, &[ExpectedType::Exact(Type::Int)])?;
                let id = self.next_id();
                asm.push_str(&templates::logical_not(id));
                return Ok(EvalType::Value(Type::Int));
            }
            _ => {}
        }

        if let Some(desc) = self.functions.get(keyword) {
            let expected: Vec<ExpectedType> =
                desc.params.iter().map(|t| ExpectedType::Exact(*t)).collect();
            check_signature(keyword, &types, &expected)?;
            let return_type = desc.return_type;
            asm.push_str(&templates::function_call(keyword));
            self.emit_free_arguments(&observed, asm);
            return Ok(EvalType::Value(return_type));
        }

        Err(CompileError::UnknownKeyword {
            keyword: keyword.to_string(),
        })
    }

    fn eval_exit(&mut self, args: &[Expr], asm: &mut String) -> Result<EvalType, CompileError> {
        if args.is_empty() {
            asm.push_str(&templates::literal_int("0"));
            asm.push_str(&templates::push_result());
        } else if args.len() == 1 {
            let ty = self.eval(&args[0], asm)?.require_value("exit")?;
            if ty != Type::Int {
                return Err(CompileError::TypeMismatch {
                    operator: "exit".to_string(),
                    position: 1,
                    expected: "INT".to_string(),
                    got: ty.to_string(),
                });
            }
            asm.push_str(&templates::push_result());
        } else {
            return Err(CompileError::ArityMismatch {
                operator: "exit".to_string(),
                expected: 1,
                got: args.len(),
            });
        }
        asm.push_str(&templates::call_extension(templates::DO_EXIT_LABEL));
        Ok(EvalType::Block)
    }

    fn eval_inc_dec(
        &mut self,
        keyword: &str,
        args: &[Expr],
        asm: &mut String,
    ) -> Result<EvalType, CompileError> {
        require_arity(keyword, args, 1)?;
        let name = atom_text(&args[0], keyword)?.to_string();

        let (slot, ty) = self
            .env
            .current()
            .lookup_variable(&name)
            .ok_or_else(|| CompileError::UndeclaredVariable { name: name.clone() })?;
        if ty != Type::Int {
            return Err(CompileError::TypeMismatch {
                operator: keyword.to_string(),
                position: 1,
                expected: "INT".to_string(),
                got: ty.to_string(),
            });
        }

        let offset = ownership::local_offset(slot);
        asm.push_str(if keyword == "inc" {
            &templates::inc_local(offset)
        } else {
            &templates::dec_local(offset)
        });
        Ok(EvalType::Value(Type::Undef))
    }

    fn eval_loop_control(
        &mut self,
        keyword: &str,
        args: &[Expr],
        asm: &mut String,
    ) -> Result<EvalType, CompileError> {
        require_arity(keyword, args, 0)?;
        let loop_desc = *self
            .env
            .current()
            .innermost_loop()
            .ok_or_else(|| CompileError::LoopControlOutsideLoop {
                keyword: keyword.to_string(),
            })?;

        let flattened: Vec<Binding> = self
            .env
            .current()
            .flatten()
            .into_iter()
            .cloned()
            .collect();
        let flat_refs: Vec<&Binding> = flattened.iter().collect();

        asm.push_str(&ownership::loop_control_asm(
            &flat_refs,
            loop_desc.slots_at_entry,
            loop_desc.id,
            keyword == "break",
        ));
        Ok(EvalType::Block)
    }

    fn emit_free_arguments(&self, observed: &[ObservedArg], asm: &mut String) {
        for (ty, is_bare_reference) in observed {
            let was_unnamed_temporary = !is_bare_reference;
            asm.push_str(&ownership::free_argument_asm(*ty, was_unnamed_temporary));
        }
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

fn is_integer_literal(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

fn require_arity(operator: &str, args: &[Expr], expected: usize) -> Result<(), CompileError> {
    if args.len() != expected {
        return Err(CompileError::ArityMismatch {
            operator: operator.to_string(),
            expected,
            got: args.len(),
        });
    }
    Ok(())
}

fn require_identifier(name: &str) -> Result<(), CompileError> {
    match name.chars().next() {
        Some(c) if c.is_alphabetic() => Ok(()),
        _ => Err(CompileError::InvalidIdentifier {
            name: name.to_string(),
        }),
    }
}

fn atom_text<'a>(expr: &'a Expr, context: &str) -> Result<&'a str, CompileError> {
    match expr {
        Expr::Atom(s) => Ok(s.as_str()),
        _ => Err(CompileError::Syntax(format!(
            "{}: expected a bare name, got a compound expression",
            context
        ))),
    }
}

fn expect_block_text<'a>(expr: &'a Expr, context: &str) -> Result<&'a str, CompileError> {
    match expr {
        Expr::Block(raw) => Ok(raw.as_str()),
        _ => Err(CompileError::MalformedBlock {
            snippet: format!("{}: expected a {{ ... }} block", context),
        }),
    }
}

/// `(signature, result type)` for each built-in extension call (spec §6
/// table).
fn builtin_signature(name: &str) -> Option<(&'static [ExpectedType], EvalType)> {
    use ExpectedType::{Exact, OneOf};
    const STRINGY: &[Type] = &[Type::String, Type::StringLit];
    static PRINT_SIG: [ExpectedType; 1] = [OneOf(STRINGY)];
    static PRINT_I_SIG: [ExpectedType; 1] = [Exact(Type::Int)];
    static FREE_STR_SIG: [ExpectedType; 1] = [Exact(Type::String)];
    static INT2STR_SIG: [ExpectedType; 1] = [Exact(Type::Int)];
    static STRING_SIG: [ExpectedType; 1] = [OneOf(STRINGY)];
    static CONCAT_SIG: [ExpectedType; 2] = [OneOf(STRINGY), OneOf(STRINGY)];
    static SUBSTR_SIG: [ExpectedType; 3] = [OneOf(STRINGY), Exact(Type::Int), Exact(Type::Int)];
    static REVERSE_SIG: [ExpectedType; 1] = [OneOf(STRINGY)];
    static UPPERLOWER_SIG: [ExpectedType; 3] = [OneOf(STRINGY), Exact(Type::Int), Exact(Type::Int)];
    static LEN_SIG: [ExpectedType; 1] = [OneOf(STRINGY)];

    match name {
        "print" => Some((&PRINT_SIG, EvalType::Value(Type::Undef))),
        "println" => Some((&PRINT_SIG, EvalType::Value(Type::Undef))),
        "print_i" => Some((&PRINT_I_SIG, EvalType::Value(Type::Undef))),
        "println_i" => Some((&PRINT_I_SIG, EvalType::Value(Type::Undef))),
        "free_str" => Some((&FREE_STR_SIG, EvalType::Value(Type::Undef))),
        "Int2Str" => Some((&INT2STR_SIG, EvalType::Value(Type::String))),
        "String" => Some((&STRING_SIG, EvalType::Value(Type::String))),
        "Concat" => Some((&CONCAT_SIG, EvalType::Value(Type::String))),
        "Substr" => Some((&SUBSTR_SIG, EvalType::Value(Type::String))),
        "Reverse" => Some((&REVERSE_SIG, EvalType::Value(Type::String))),
        "Upper" => Some((&UPPERLOWER_SIG, EvalType::Value(Type::String))),
        "Lower" => Some((&UPPERLOWER_SIG, EvalType::Value(Type::String))),
        "len" => Some((&LEN_SIG, EvalType::Value(Type::Int))),
        _ => None,
    }
}
