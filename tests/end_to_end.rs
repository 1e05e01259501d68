//! End-to-end scenarios: compile representative SPL programs and check the
//! structural properties the emitted NASM must have. This crate does not
//! assemble or link the output, so assertions are on the text shape the
//! scenarios describe rather than on a program's runtime output.

fn compile_ok(src: &str) -> String {
    let mut src = src.as_bytes().to_vec();
    src.push(0);
    let mut out = Vec::new();
    splc::compile(&src, &mut out).expect("program is expected to compile");
    String::from_utf8(out).unwrap()
}

fn compile_err(src: &str) -> splc::CompileError {
    let mut src = src.as_bytes().to_vec();
    src.push(0);
    let mut out = Vec::new();
    splc::compile(&src, &mut out).expect_err("program is expected to be rejected")
}

#[test]
fn scenario_1_empty_main() {
    let asm = compile_ok("proc main() { }");
    assert!(asm.contains("global main"));
    assert!(asm.contains("main:\n    push rbp\n    mov rbp, rsp"));
    assert!(asm.contains("    pop rbp\n    ret"));
}

#[test]
fn scenario_2_arithmetic_and_printi() {
    let asm = compile_ok("proc main() { var x: int; x := 2 + 3; printi(x); }");
    assert!(asm.contains("extern printi"));
    assert!(asm.contains("mov rax, 2"));
    assert!(asm.contains("mov rax, 3"));
    assert!(asm.contains("add rax, rcx"));
    assert!(asm.contains("call printi"));
}

#[test]
fn scenario_3_array_read_write_with_bounds_checks() {
    let asm = compile_ok(
        "type A = array[4] of int; \
         proc main() { var a: A; a[0] := 7; a[3] := 9; printi(a[0]); printi(a[3]); }",
    );
    // two stores and two loads through indexed addressing, each bounds-checked
    assert_eq!(asm.matches("cmp rax, 4").count(), 4);
    assert_eq!(asm.matches("call exit").count(), 4);
    assert_eq!(asm.matches("call printi").count(), 2);
}

#[test]
fn scenario_4_ref_parameter_roundtrip() {
    let asm = compile_ok(
        "proc inc(ref x: int) { x := x + 1; } \
         proc main() { var v: int; v := 10; inc(v); printi(v); }",
    );
    assert!(asm.contains("inc:"));
    // inc's body dereferences x to read it and writes back through the pointer.
    assert!(asm.contains("mov rax, [rax]"));
    assert!(asm.contains("call inc"));
    // main passes v by address, not by value: a `lea`, not a plain load.
    assert!(asm.contains("lea r10"));
}

#[test]
fn scenario_5_primitive_alias_equivalence() {
    // Aliases of `int` flatten to the same primitive entry, so this is
    // accepted.
    let asm = compile_ok(
        "type T1 = int; type T2 = int; \
         proc main() { var a: T1; var b: T2; a := b; }",
    );
    assert!(asm.contains("main:"));
}

#[test]
fn scenario_5_distinct_array_aliases_are_rejected() {
    // `x[0]`/`y[0]` both resolve to the shared `int` element type, so the
    // mismatch must be exercised by passing a `B` where an `A` is expected.
    let err = compile_err(
        "type A = array[4] of int; type B = array[4] of int; \
         proc f(x: A) { } \
         proc main() { var y: B; f(y); }",
    );
    assert!(matches!(err, splc::CompileError::Semantic { .. }));
}

#[test]
fn scenario_6_nine_params_use_stack_and_24_byte_outgoing_area() {
    let asm = compile_ok(
        "proc nine(a: int, b: int, c: int, d: int, e: int, g: int, h: int, i: int, j: int) { } \
         proc main() { nine(1, 2, 3, 4, 5, 6, 7, 8, 9); }",
    );
    assert!(asm.contains("mov [rsp+0], rax"));
    assert!(asm.contains("mov [rsp+8], rax"));
    assert!(asm.contains("mov [rsp+16], rax"));
    // main's frame must reserve a 24-byte outgoing area (3 stack args * 8),
    // rounded up to 16-byte alignment: local_area=0, arg_area=0, outgoing=24 -> 32.
    assert!(asm.contains("main:\n    push rbp\n    mov rbp, rsp\n    sub rsp, 32"));
}

#[test]
fn array_index_at_upper_bound_and_one_past_are_both_handled_by_the_same_check() {
    // index = N-1 and index = N are both covered by a single compile-time
    // emitted bounds check; this asserts the check exists for both reads.
    let asm = compile_ok(
        "type A = array[4] of int; \
         proc main() { var a: A; var i: int; i := 3; a[i] := 1; }",
    );
    assert!(asm.contains("jl "));
    assert!(asm.contains("jge "));
}

#[test]
fn undeclared_procedure_call_is_a_semantic_error() {
    let err = compile_err("proc main() { bogus(1); }");
    assert!(matches!(err, splc::CompileError::Semantic { .. }));
}

#[test]
fn integer_overflow_aborts_lexing() {
    let err = compile_err("proc main() { var x: int; x := 99999999999999999999; }");
    assert!(matches!(err, splc::CompileError::Lexical { .. }));
}
