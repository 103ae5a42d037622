//! End-to-end tests asserting on the structure of the emitted assembly.
//!
//! No assembler or linker is a build dependency, so these check that the
//! generated text contains the instructions and call sequences a correct
//! compilation must produce, rather than actually running the binary.

fn compile(source: &str) -> String {
    sx86c::compile_source(source).expect("expected successful compilation")
}

fn compile_err(source: &str) -> String {
    sx86c::compile_source(source).expect_err("expected a compile error")
}

#[test]
fn exit_with_integer_literal() {
    let asm = compile("exit(5)");
    assert!(asm.contains("movl $5, %eax"));
    assert!(asm.contains("call do_exit"));
    assert!(asm.contains("do_exit:"));
}

#[test]
fn exit_with_arithmetic_expression() {
    let asm = compile("exit(add(2, 3))");
    assert!(asm.contains("addl %ecx, %eax"));
    assert!(asm.contains("call do_exit"));
}

#[test]
fn non_commutative_binary_op_pops_first_source_argument_into_eax() {
    // sub(a, b) must compute a - b: the first-pushed (first source) value
    // has to land in %eax, the AT&T destination operand, before the
    // subtraction so the mnemonic computes `first - second`, not the
    // reverse.
    let asm = compile("exit(sub(7, 2))");
    let pop_eax = asm.find("popl %eax").unwrap();
    let pop_ecx = asm.find("popl %ecx").unwrap();
    let op = asm.find("subl %ecx, %eax").unwrap();
    assert!(pop_eax < pop_ecx);
    assert!(pop_ecx < op);
}

#[test]
fn comparison_op_tests_source_order_not_push_order() {
    // lt(a, b) must test a < b; %eax holds the first source argument so
    // `cmpl %ecx, %eax` computes first - second in the right direction.
    let asm = compile("exit(lt(1, 2))");
    let pop_eax = asm.find("popl %eax").unwrap();
    let pop_ecx = asm.find("popl %ecx").unwrap();
    let cmp = asm.find("cmpl %ecx, %eax").unwrap();
    assert!(pop_eax < pop_ecx);
    assert!(pop_ecx < cmp);
    assert!(asm.contains("setl %al"));
}

#[test]
fn div_emits_sign_extension_and_single_operand_idivl() {
    let asm = compile("exit(div(7, 2))");
    assert!(asm.contains("cltd"));
    assert!(asm.contains("idivl %ecx"));
    assert!(!asm.contains("idivl %ecx, %eax"));
}

#[test]
fn mod_moves_the_remainder_out_of_edx_into_eax() {
    let asm = compile("exit(mod(7, 2))");
    assert!(asm.contains("cltd"));
    assert!(asm.contains("idivl %ecx"));
    assert!(asm.contains("movl %edx, %eax"));
}

#[test]
fn var_set_and_exit_round_trip_through_a_local() {
    let asm = compile("var(x, 10) set(x, add(x, 5)) exit(x)");
    // one store for the declaration, one store for the reassignment
    assert_eq!(asm.matches("movl %eax, 4(%ebp)").count(), 2);
}

#[test]
fn while_loop_emits_condition_check_and_back_edge() {
    let asm = compile(
        "var(n, 0) while(lt(n, 3), { print_i(n) inc(n) }) exit(0)",
    );
    assert!(asm.contains(".Lwhile_"));
    assert!(asm.contains("jmp .Lwhile_"));
    assert!(asm.contains("call print_i"));
    assert!(asm.contains("incl"));
}

#[test]
fn recursive_function_can_call_itself() {
    let source = "\
        function(fact, [n:INT], INT, {\n\
            if(le(n, 1), {\n\
                return(1)\n\
            }, {\n\
                return(mul(n, fact(sub(n, 1))))\n\
            })\n\
        })\n\
        exit(fact(5))\n\
    ";
    let asm = compile(source);
    assert!(asm.contains("func_fact:"));
    assert!(asm.contains("call func_fact"));
}

#[test]
fn concat_result_passed_directly_to_a_call_frees_the_unnamed_temporary() {
    // Concat(...) is a compound expression, so its result is an unnamed
    // temporary nothing owns; print's post-call cleanup must free it.
    let asm = compile("print(Concat('a', 'b')) exit(0)");
    assert_eq!(asm.matches("free_str").count(), 1);
}

#[test]
fn move_assignment_retypes_the_source_and_only_frees_the_destination() {
    // `s`'s ownership moves into `t` on declaration; at the enclosing
    // block's exit only `t` (still STRING) is freed, not `s` (now UNDEF).
    let asm = compile("block({ var(s, Concat('a', 'b')) var(t, s) }) exit(0)");
    assert_eq!(asm.matches("free_str").count(), 1);
}

#[test]
fn set_on_an_undeclared_variable_is_an_error() {
    let msg = compile_err("set(x, 5) exit(0)");
    assert!(msg.contains("undeclared"));
}

#[test]
fn redeclaring_a_variable_in_the_same_block_is_an_error() {
    let msg = compile_err("var(x, 1) var(x, 2) exit(0)");
    assert!(msg.contains("Redeclaration Error"));
}

#[test]
fn if_condition_must_be_an_integer() {
    let msg = compile_err("if('hi', { exit(0) }) exit(1)");
    assert!(msg.contains("if condition must be of type INT"));
}

#[test]
fn return_type_mismatch_is_rejected() {
    let source = "\
        function(f, [], INT, {\n\
            return('oops')\n\
        })\n\
        exit(f())\n\
    ";
    let msg = compile_err(source);
    assert!(msg.contains("return type mismatch"));
}

#[test]
fn unbalanced_parentheses_are_rejected() {
    let msg = compile_err("exit(add(2, 3)");
    assert!(msg.contains("unbalanced"));
}

#[test]
fn break_outside_a_loop_is_an_error() {
    let msg = compile_err("break() exit(0)");
    assert!(msg.contains("used outside of a loop"));
}

#[test]
fn println_with_no_arguments_prints_a_bare_newline() {
    let asm = compile("println() exit(0)");
    assert!(asm.contains("call println"));
}

#[test]
fn compile_to_file_writes_the_assembly_to_disk() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("out.asm");
    sx86c::driver::compile_to_file("exit(5)", &path).expect("compile to file");
    let written = std::fs::read_to_string(&path).expect("read generated file");
    assert!(written.contains("call do_exit"));
}
