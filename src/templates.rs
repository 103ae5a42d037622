//! Assembly Template Bank.
//!
//! A fixed catalog of parameterized 32-bit x86 (AT&T/GAS) assembly
//! fragments, keyed by operation name. Pure functions from `(op, params)` to
//! text — nothing here inspects compiler state. The evaluator is the only
//! caller; this module's job is just to keep every fragment's shape in one
//! place.
//!
//! Stack-machine convention: every fragment leaves its result, if any, in
//! `%eax`. `push_result`/`pop_into_eax` move values between `%eax` and the
//! machine stack; locals and parameters are addressed off `%ebp`.

pub fn literal_int(text: &str) -> String {
    format!("  movl ${}, %eax\n", text)
}

pub fn literal_label(label: &str) -> String {
    format!("  movl ${}, %eax\n", label)
}

pub fn push_result() -> String {
    "  pushl %eax\n".to_string()
}

/// Reclaim one local's stack slot at block exit (the value, if owned, has
/// already been freed by the caller before this is emitted).
pub fn pop_local() -> String {
    "  addl $4, %esp\n".to_string()
}

pub fn clear_stack(bytes: i32) -> String {
    format!("  addl ${}, %esp\n", bytes)
}

pub fn get_local(offset: i32) -> String {
    format!("  movl {}(%ebp), %eax\n", offset)
}

pub fn store_local(offset: i32) -> String {
    format!("  popl %eax\n  movl %eax, {}(%ebp)\n", offset)
}

pub fn get_parameter(offset: i32) -> String {
    format!("  movl {}(%ebp), %eax\n", offset)
}

pub fn inc_local(offset: i32) -> String {
    format!("  incl {}(%ebp)\n", offset)
}

pub fn dec_local(offset: i32) -> String {
    format!("  decl {}(%ebp)\n", offset)
}

pub fn if_start(id: u64) -> String {
    format!("  popl %eax\n  cmpl $0, %eax\n  je .Lelse_{0}\n", id)
}

pub fn else_start(id: u64) -> String {
    format!("  jmp .Lendif_{0}\n.Lelse_{0}:\n", id)
}

pub fn if_end(id: u64) -> String {
    format!(".Lendif_{0}:\n", id)
}

pub fn while_start(id: u64) -> String {
    format!(".Lwhile_{0}:\n", id)
}

pub fn while_condition(id: u64) -> String {
    format!("  popl %eax\n  cmpl $0, %eax\n  je .Lwhile_end_{0}\n", id)
}

pub fn while_end(id: u64) -> String {
    format!("  jmp .Lwhile_{0}\n.Lwhile_end_{0}:\n", id)
}

pub fn while_break(id: u64) -> String {
    format!("  jmp .Lwhile_end_{}\n", id)
}

pub fn while_continue(id: u64) -> String {
    format!("  jmp .Lwhile_{}\n", id)
}

pub fn function_prologue(name: &str) -> String {
    format!(
        "{0}:\n  pushl %ebp\n  movl %esp, %ebp\n",
        function_label(name)
    )
}

pub fn function_epilogue(name: &str) -> String {
    format!("  movl %ebp, %esp\n  popl %ebp\n  ret\n.Lend_{}:\n", name)
}

pub fn function_label(name: &str) -> String {
    format!("func_{}", name)
}

/// Stack-argument reclaim is left to the per-argument `free_arguments` pass
/// (see `ownership::free_argument_asm`), not done here in bulk, so that an
/// owned `STRING` temporary's heap free and its slot reclaim stay a single
/// step.
pub fn function_call(name: &str) -> String {
    format!("  call {}\n", function_label(name))
}

pub fn return_epilogue() -> String {
    "  movl %ebp, %esp\n  popl %ebp\n  ret\n".to_string()
}

pub fn call_extension(name: &str) -> String {
    format!("  call {}\n", name)
}

/// Label of the shared exit routine `exit(...)` calls into; see
/// `builtin_exit_snippet`.
pub const DO_EXIT_LABEL: &str = "do_exit";

/// The one place the exit syscall is made. `exit(code)` pushes `code` and
/// calls here instead of inlining the syscall at every call site.
pub fn builtin_exit_snippet() -> String {
    format!(
        "{}:\n  popl %ebx\n  movl $1, %eax\n  int $0x80\n",
        DO_EXIT_LABEL
    )
}

pub fn unary_op(op: &str) -> String {
    match op {
        "neg" => "  popl %eax\n  negl %eax\n".to_string(),
        _ => format!("  popl %eax\n  {} %eax\n", op),
    }
}

/// Arguments were pushed in reverse source order, so the *first* source
/// argument is on top of the stack. Pop it into `%eax` (the AT&T
/// destination operand) and the second into `%ecx`, so
/// `{mnemonic} %ecx, %eax` computes `first OP second`, matching source order.
pub fn binary_op(mnemonic: &str) -> String {
    format!(
        "  popl %eax\n  popl %ecx\n  {} %ecx, %eax\n",
        mnemonic
    )
}

/// Same first-pushed-on-top convention as `binary_op`: `%eax` holds the
/// first source argument, `%ecx` the second, so `cmpl %ecx, %eax` tests
/// `first - second` and the `setX` that follows compares in source order.
pub fn comparison_op(set_insn: &str, id: u64) -> String {
    format!(
        "  popl %eax\n  popl %ecx\n  cmpl %ecx, %eax\n  {} %al\n  movzbl %al, %eax\n  # cmp_{1}\n",
        set_insn, id
    )
}

/// `idivl` is a one-operand instruction: it divides `%edx:%eax` by its
/// operand, leaving the quotient in `%eax` and the remainder in `%edx`.
/// `cltd` sign-extends `%eax` into `%edx` first. `%eax` holds the first
/// source argument (the dividend), `%ecx` the second (the divisor), per the
/// same first-pushed-on-top convention as `binary_op`.
pub fn div_op() -> String {
    "  popl %eax\n  popl %ecx\n  cltd\n  idivl %ecx\n".to_string()
}

/// Same as `div_op`, but the result is the remainder left in `%edx`.
pub fn mod_op() -> String {
    "  popl %eax\n  popl %ecx\n  cltd\n  idivl %ecx\n  movl %edx, %eax\n".to_string()
}

pub fn logical_and(id: u64) -> String {
    format!(
        "  popl %ecx\n  popl %eax\n  cmpl $0, %eax\n  je .Land_false_{0}\n  cmpl $0, %ecx\n  je .Land_false_{0}\n  movl $1, %eax\n  jmp .Land_end_{0}\n.Land_false_{0}:\n  movl $0, %eax\n.Land_end_{0}:\n",
        id
    )
}

pub fn logical_or(id: u64) -> String {
    format!(
        "  popl %ecx\n  popl %eax\n  cmpl $0, %eax\n  jne .Lor_true_{0}\n  cmpl $0, %ecx\n  jne .Lor_true_{0}\n  movl $0, %eax\n  jmp .Lor_end_{0}\n.Lor_true_{0}:\n  movl $1, %eax\n.Lor_end_{0}:\n",
        id
    )
}

pub fn logical_not(id: u64) -> String {
    format!(
        "  popl %eax\n  cmpl $0, %eax\n  sete %al\n  movzbl %al, %eax\n  # not_{0}\n",
        id
    )
}

pub fn check_overflow(id: u64) -> String {
    format!(
        "  seto %al\n  movzbl %al, %eax\n  # overflow_{0}\n",
        id
    )
}

pub fn data_string(label: &str, raw_text: &str) -> String {
    format!("{}:\n  .string \"{}\"\n", label, raw_text)
}

pub fn data_section_preamble() -> String {
    ".data\n".to_string()
}

pub fn text_section_preamble() -> String {
    ".text\n".to_string()
}

pub fn start_label() -> String {
    ".globl _start\n_start:\n".to_string()
}

pub fn default_exit() -> String {
    "  movl $0, %ebx\n  movl $1, %eax\n  int $0x80\n".to_string()
}

pub fn header() -> String {
    "# generated by sx86c\n".to_string()
}
