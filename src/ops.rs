use std::fmt;

use crate::value::Value;

/// A single decoded EvilStack instruction.
///
/// Each variant carries only the operand shape its opcode needs: nothing,
/// a literal [`Value`], or a jump target. Targets are absolute instruction
/// indices, resolved once by the assembler; no label names survive into
/// the executable form.
#[derive(Clone, Debug, PartialEq)]
pub enum Instruction {
    // Stack
    Push(Value),
    Pop,
    Dup,
    Swap,

    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,

    // Comparison and control flow
    Cmp,
    Jmp(usize),
    Jeq(usize),
    Jne(usize),
    Jgt(usize),
    Jlt(usize),
    Jge(usize),
    Jle(usize),
    Call(usize),
    Ret,
    Exit,

    // Heap
    Store,
    Load,

    // Conversion
    Atoi,
    Itoa,
    Itof,
    Ftoi,

    // Builtins
    Print,
    Read,
    Rand,
    Time,
}

impl Instruction {
    /// The source mnemonic of this instruction.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Instruction::Push(_) => "push",
            Instruction::Pop => "pop",
            Instruction::Dup => "dup",
            Instruction::Swap => "swap",
            Instruction::Add => "add",
            Instruction::Sub => "sub",
            Instruction::Mul => "mul",
            Instruction::Div => "div",
            Instruction::Mod => "mod",
            Instruction::Cmp => "cmp",
            Instruction::Jmp(_) => "jmp",
            Instruction::Jeq(_) => "jeq",
            Instruction::Jne(_) => "jne",
            Instruction::Jgt(_) => "jgt",
            Instruction::Jlt(_) => "jlt",
            Instruction::Jge(_) => "jge",
            Instruction::Jle(_) => "jle",
            Instruction::Call(_) => "call",
            Instruction::Ret => "ret",
            Instruction::Exit => "exit",
            Instruction::Store => "store",
            Instruction::Load => "load",
            Instruction::Atoi => "atoi",
            Instruction::Itoa => "itoa",
            Instruction::Itof => "itof",
            Instruction::Ftoi => "ftoi",
            Instruction::Print => "print",
            Instruction::Read => "read",
            Instruction::Rand => "rand",
            Instruction::Time => "time",
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Push(Value::Text(s)) => write!(f, "push {:?}", s),
            Instruction::Push(value) => write!(f, "push {}", value),
            Instruction::Jmp(target)
            | Instruction::Jeq(target)
            | Instruction::Jne(target)
            | Instruction::Jgt(target)
            | Instruction::Jlt(target)
            | Instruction::Jge(target)
            | Instruction::Jle(target)
            | Instruction::Call(target) => write!(f, "{} {}", self.mnemonic(), target),
            _ => f.write_str(self.mnemonic()),
        }
    }
}
