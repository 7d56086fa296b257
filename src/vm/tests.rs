use super::*;
use crate::asm::assemble;
use crate::io::ScriptedIo;
use crate::vm::RunError::InstructionFailed;

fn run_src(source: &str) -> Vec<Value> {
    let program = assemble(source).unwrap();
    let mut io = ScriptedIo::new();
    super::run(&program, &mut io, VmOptions::default()).unwrap().stack
}

fn run_with_io(source: &str, io: &mut ScriptedIo) -> Result<RunResult, RunError> {
    let program = assemble(source).unwrap();
    super::run(&program, io, VmOptions::default())
}

fn run_err(source: &str) -> RunError {
    let program = assemble(source).unwrap();
    let mut io = ScriptedIo::new();
    super::run(&program, &mut io, VmOptions::default()).unwrap_err()
}

/// The operation error of an expected `InstructionFailed`, plus the
/// index it failed at.
fn fail_at(source: &str) -> (usize, OperationError) {
    match run_err(source) {
        InstructionFailed { index, error, .. } => (index, error),
        other => panic!("expected InstructionFailed, got {:?}", other),
    }
}

fn ints(values: &[i64]) -> Vec<Value> {
    values.iter().map(|&i| Value::Integer(i)).collect()
}

#[test]
fn test_empty_program() {
    let result = run_with_io("", &mut ScriptedIo::new()).unwrap();
    assert!(result.stack.is_empty());
    assert_eq!(result.instruction_counter, 0);
}

#[test]
fn test_push_and_stack_ops() {
    assert_eq!(run_src("push 1\npush 2\npush 3\n"), ints(&[1, 2, 3]));
    assert_eq!(run_src("push 1\npush 2\npop\n"), ints(&[1]));
    assert_eq!(run_src("push 7\ndup\n"), ints(&[7, 7]));
    assert_eq!(run_src("push 1\npush 2\nswap\n"), ints(&[2, 1]));
    assert_eq!(
        run_src("push \"a b\"\n"),
        vec![Value::Text("a b".to_string())]
    );
}

#[test]
fn test_stack_underflow() {
    assert_eq!(fail_at("pop\n"), (0, OperationError::StackUnderflow { required: 1, depth: 0 }));
    assert_eq!(fail_at("dup\n"), (0, OperationError::StackUnderflow { required: 1, depth: 0 }));
    assert_eq!(
        fail_at("push 1\nswap\n"),
        (1, OperationError::StackUnderflow { required: 2, depth: 1 })
    );
    assert_eq!(
        fail_at("push 1\nadd\n"),
        (1, OperationError::StackUnderflow { required: 2, depth: 1 })
    );
}

#[test]
fn test_arithmetic_operand_order() {
    // The later push is the right operand.
    assert_eq!(run_src("push 10\npush 4\nsub\n"), ints(&[6]));
    assert_eq!(run_src("push 10\npush 4\ndiv\n"), ints(&[2]));
    assert_eq!(run_src("push 10\npush 4\nmod\n"), ints(&[2]));
}

#[test]
fn test_truncating_division() {
    assert_eq!(run_src("push -7\npush 2\ndiv\n"), ints(&[-3]));
    assert_eq!(run_src("push -7\npush 2\nmod\n"), ints(&[-1]));
    assert_eq!(run_src("push 7\npush -2\ndiv\n"), ints(&[-3]));
    assert_eq!(run_src("push 7\npush -2\nmod\n"), ints(&[1]));
}

#[test]
fn test_float_promotion() {
    assert_eq!(run_src("push 1\npush 0.5\nadd\n"), vec![Value::Float(1.5)]);
    assert_eq!(run_src("push 1.5\npush 2\nmul\n"), vec![Value::Float(3.0)]);
    assert_eq!(run_src("push 1.0\npush 2\ndiv\n"), vec![Value::Float(0.5)]);
}

#[test]
fn test_division_by_zero() {
    assert_eq!(fail_at("push 1\npush 0\ndiv\n"), (2, OperationError::DivisionByZero));
    assert_eq!(fail_at("push 1\npush 0\nmod\n"), (2, OperationError::DivisionByZero));
    assert_eq!(fail_at("push 1.0\npush 0.0\ndiv\n"), (2, OperationError::DivisionByZero));
}

#[test]
fn test_text_arithmetic_fails() {
    assert!(matches!(
        fail_at("push \"a\"\npush \"b\"\nadd\n"),
        (2, OperationError::TypeError { .. })
    ));
    assert!(matches!(
        fail_at("push 1\npush \"b\"\nsub\n"),
        (2, OperationError::TypeError { .. })
    ));
}

#[test]
fn test_integer_overflow() {
    assert_eq!(
        fail_at("push 9223372036854775807\npush 1\nadd\n"),
        (2, OperationError::IntegerOverflow)
    );
}

#[test]
fn test_conversions() {
    assert_eq!(run_src("push \"42\"\natoi\n"), ints(&[42]));
    assert_eq!(run_src("push \"-17\"\natoi\n"), ints(&[-17]));
    assert_eq!(run_src("push -42\nitoa\natoi\n"), ints(&[-42]));
    assert_eq!(run_src("push 3\nitof\n"), vec![Value::Float(3.0)]);
    assert_eq!(run_src("push 1.9\nftoi\n"), ints(&[1]));
    assert_eq!(run_src("push -1.9\nftoi\n"), ints(&[-1]));
}

#[test]
fn test_conversion_errors() {
    assert_eq!(
        fail_at("push \"x1\"\natoi\n"),
        (1, OperationError::ConversionError { text: "x1".to_string() })
    );
    assert!(matches!(fail_at("push 1\natoi\n"), (1, OperationError::TypeError { .. })));
    assert!(matches!(fail_at("push 1.0\nitoa\n"), (1, OperationError::TypeError { .. })));
    assert!(matches!(fail_at("push 1\nftoi\n"), (1, OperationError::TypeError { .. })));
    assert!(matches!(fail_at("push 1.0\nitof\n"), (1, OperationError::TypeError { .. })));
}

#[test]
fn test_cmp_consumes_operands() {
    let result = run_src("push 3\npush 5\ncmp\n");
    assert!(result.is_empty());
}

#[test]
fn test_branch_selection() {
    // 3 < 5: jgt falls through, jmp skips the push of 1.
    let mut io = ScriptedIo::new();
    let source = "push 3\npush 5\ncmp\njgt @big\npush 0\njmp @end\nbig:\npush 1\nend:\nprint\n";
    run_with_io(source, &mut io).unwrap();
    assert_eq!(io.output, vec!["0"]);

    // 5 > 3: jgt taken.
    let mut io = ScriptedIo::new();
    let source = "push 5\npush 3\ncmp\njgt @big\npush 0\njmp @end\nbig:\npush 1\nend:\nprint\n";
    run_with_io(source, &mut io).unwrap();
    assert_eq!(io.output, vec!["1"]);
}

#[test]
fn test_conditional_jump_family() {
    let branch = |a: i64, b: i64, jump: &str| -> Vec<Value> {
        run_src(&format!(
            "push {a}\npush {b}\ncmp\n{jump} @taken\npush 0\nexit\ntaken:\npush 1\n"
        ))
    };

    assert_eq!(branch(1, 1, "jeq"), ints(&[1]));
    assert_eq!(branch(1, 2, "jeq"), ints(&[0]));
    assert_eq!(branch(1, 2, "jne"), ints(&[1]));
    assert_eq!(branch(2, 2, "jne"), ints(&[0]));
    assert_eq!(branch(3, 2, "jgt"), ints(&[1]));
    assert_eq!(branch(2, 3, "jlt"), ints(&[1]));
    assert_eq!(branch(2, 2, "jge"), ints(&[1]));
    assert_eq!(branch(1, 2, "jge"), ints(&[0]));
    assert_eq!(branch(2, 2, "jle"), ints(&[1]));
    assert_eq!(branch(3, 2, "jle"), ints(&[0]));
}

#[test]
fn test_text_comparison() {
    assert_eq!(
        run_src("push \"apple\"\npush \"banana\"\ncmp\njlt @yes\npush 0\nexit\nyes:\npush 1\n"),
        ints(&[1])
    );
}

#[test]
fn test_conditional_jump_requires_cmp() {
    assert_eq!(fail_at("target:\njeq @target\n"), (0, OperationError::UninitializedFlag));
    assert_eq!(fail_at("target:\njle @target\n"), (0, OperationError::UninitializedFlag));
    // jmp never consults the flag.
    assert_eq!(run_src("jmp @end\npush 9\nend:\n"), ints(&[]));
}

#[test]
fn test_unconditional_loop() {
    // Counts down from 3 to 0.
    let source = "push 3\n\
                  loop:\n\
                  dup\n\
                  push 0\n\
                  cmp\n\
                  jeq @done\n\
                  push 1\n\
                  sub\n\
                  jmp @loop\n\
                  done:\n";
    assert_eq!(run_src(source), ints(&[0]));
}

#[test]
fn test_call_and_ret() {
    // The subroutine runs once and control returns past the call.
    let source = "push 2\n\
                  call @double\n\
                  push 100\n\
                  add\n\
                  exit\n\
                  double:\n\
                  push 2\n\
                  mul\n\
                  ret\n";
    assert_eq!(run_src(source), ints(&[104]));
}

#[test]
fn test_nested_calls() {
    let source = "call @outer\n\
                  exit\n\
                  outer:\n\
                  push 1\n\
                  call @inner\n\
                  push 2\n\
                  ret\n\
                  inner:\n\
                  push 10\n\
                  ret\n";
    assert_eq!(run_src(source), ints(&[1, 10, 2]));
}

#[test]
fn test_ret_with_empty_call_stack() {
    assert_eq!(fail_at("ret\n"), (0, OperationError::CallStackUnderflow));
}

#[test]
fn test_store_and_load() {
    assert_eq!(run_src("push 10\npush 99\nstore\npush 10\nload\n"), ints(&[99]));
    assert_eq!(
        run_src("push 0\npush \"text\"\nstore\npush 0\nload\n"),
        vec![Value::Text("text".to_string())]
    );
    // A later store overwrites the cell.
    assert_eq!(
        run_src("push 5\npush 1\nstore\npush 5\npush 2\nstore\npush 5\nload\n"),
        ints(&[2])
    );
}

#[test]
fn test_load_from_unmapped_address() {
    assert_eq!(
        fail_at("push 7\nload\n"),
        (1, OperationError::UnmappedAddress { address: 7 })
    );
}

#[test]
fn test_bad_heap_addresses() {
    assert!(matches!(fail_at("push -1\nload\n"), (1, OperationError::TypeError { .. })));
    assert!(matches!(
        fail_at("push 1.0\npush 5\nstore\n"),
        (2, OperationError::TypeError { .. })
    ));
}

#[test]
fn test_print() {
    let mut io = ScriptedIo::new();
    run_with_io("push 42\nprint\npush 2.5\nprint\npush \"hi\"\nprint\n", &mut io).unwrap();
    assert_eq!(io.output, vec!["42", "2.5", "hi"]);
}

#[test]
fn test_print_consumes_the_top() {
    let mut io = ScriptedIo::new();
    let result = run_with_io("push 1\npush 2\nprint\n", &mut io).unwrap();
    assert_eq!(result.stack, ints(&[1]));
}

#[test]
fn test_read_parse_policy() {
    let mut io = ScriptedIo::new().with_input(["42", "2.5", "  hello  ", "12ab"]);
    let result = run_with_io("read\nread\nread\nread\n", &mut io).unwrap();
    assert_eq!(
        result.stack,
        vec![
            Value::Integer(42),
            Value::Float(2.5),
            Value::Text("hello".to_string()),
            Value::Text("12ab".to_string()),
        ]
    );
}

#[test]
fn test_read_past_end_of_input() {
    let program = assemble("read\nread\n").unwrap();
    let mut io = ScriptedIo::new().with_input(["only one"]);
    let error = super::run(&program, &mut io, VmOptions::default()).unwrap_err();
    assert_eq!(
        error,
        InstructionFailed {
            instruction: Instruction::Read,
            index: 1,
            error: OperationError::EndOfInput,
        }
    );
}

#[test]
fn test_rand_is_deterministic_per_seed() {
    let run_seeded = |seed: u64| -> Vec<Value> {
        let program = assemble("rand\nrand\n").unwrap();
        let mut io = ScriptedIo::seeded(seed);
        super::run(&program, &mut io, VmOptions::default()).unwrap().stack
    };
    assert_eq!(run_seeded(1), run_seeded(1));
    assert_ne!(run_seeded(1), run_seeded(2));
}

#[test]
fn test_time_uses_the_collaborator_clock() {
    let program = assemble("time\n").unwrap();
    let mut io = ScriptedIo::new();
    io.clock = 1_700_000_000;
    let result = super::run(&program, &mut io, VmOptions::default()).unwrap();
    assert_eq!(result.stack, ints(&[1_700_000_000]));
}

#[test]
fn test_exit_halts_immediately() {
    let mut io = ScriptedIo::new();
    let result = run_with_io("push 1\nexit\npush 2\nprint\n", &mut io).unwrap();
    assert_eq!(result.stack, ints(&[1]));
    assert!(io.output.is_empty());
}

#[test]
fn test_jump_to_label_past_the_last_instruction() {
    assert_eq!(run_src("push 1\njmp @end\npush 2\nend:\n"), ints(&[1]));
}

#[test]
fn test_op_limit() {
    let program = assemble("loop:\njmp @loop\n").unwrap();
    let mut io = ScriptedIo::new();
    let error = super::run(&program, &mut io, VmOptions::new(1000, usize::MAX)).unwrap_err();
    assert_eq!(error, RunError::RunTooLong { instruction_counter: 1000 });
}

#[test]
fn test_stack_size_limit() {
    let program = assemble("loop:\npush 1\njmp @loop\n").unwrap();
    let mut io = ScriptedIo::new();
    let error = super::run(&program, &mut io, VmOptions::new(u64::MAX, 10)).unwrap_err();
    assert_eq!(error, RunError::StackOverflow);
}

#[test]
fn test_instruction_failed_reports_index_and_kind() {
    let error = run_err("push 1\npush 0\ndiv\n");
    assert_eq!(
        error,
        InstructionFailed {
            instruction: Instruction::Div,
            index: 2,
            error: OperationError::DivisionByZero,
        }
    );
    assert_eq!(
        error.to_string(),
        "instruction 2 (div) failed: division by zero"
    );
}

#[test]
fn test_runs_are_independent() {
    let program = assemble("push 0\npush 1\nstore\npush 0\nload\n").unwrap();
    for _ in 0..2 {
        let mut io = ScriptedIo::new();
        let result = super::run(&program, &mut io, VmOptions::default()).unwrap();
        assert_eq!(result.stack, ints(&[1]));
    }
}
