//! The two-pass EvilStack assembler.
//!
//! Pass 1 walks the source lines in order, emitting one instruction per
//! non-blank line and binding each label to the index of the next
//! instruction. Pass 2 rewrites label operands to absolute instruction
//! indices. Assembly is all-or-nothing: errors are collected across both
//! passes and no [`Program`] is produced if any occurred.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

use crate::lexer::{self, Line, Token};
use crate::ops::Instruction;
use crate::value::Value;

/// The assembled artifact: an immutable instruction sequence plus the
/// label table it was resolved against.
///
/// Every jump target inside `instructions` is a valid index, with one
/// documented relaxation: a label bound after the last instruction
/// resolves to `instructions.len()`, and jumping there ends the program.
#[derive(Clone, Debug, PartialEq)]
pub struct Program {
    pub instructions: Vec<Instruction>,
    pub labels: HashMap<String, usize>,
}

/// A single assembly-time error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AsmError {
    #[error("line {line}: syntax error: {message}")]
    SyntaxError { line: usize, message: String },
    #[error("line {line}: unknown mnemonic `{mnemonic}`")]
    UnknownMnemonic { line: usize, mnemonic: String },
    #[error("line {line}: `{mnemonic}` expects {expected} operand(s), found {found}")]
    ArityError { line: usize, mnemonic: String, expected: usize, found: usize },
    #[error("line {line}: duplicate label `{name}`")]
    DuplicateLabel { line: usize, name: String },
    #[error("line {line}: undefined label `{name}`")]
    UndefinedLabel { line: usize, name: String },
}

/// All errors found while assembling one source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsmErrors {
    pub errors: Vec<AsmError>,
}

impl fmt::Display for AsmErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for AsmErrors {}

/// A jump-family opcode whose target is still a label name after pass 1.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum JumpKind {
    Jmp,
    Jeq,
    Jne,
    Jgt,
    Jlt,
    Jge,
    Jle,
    Call,
}

impl JumpKind {
    fn from_mnemonic(mnemonic: &str) -> Option<JumpKind> {
        Some(match mnemonic {
            "jmp" => JumpKind::Jmp,
            "jeq" => JumpKind::Jeq,
            "jne" => JumpKind::Jne,
            "jgt" => JumpKind::Jgt,
            "jlt" => JumpKind::Jlt,
            "jge" => JumpKind::Jge,
            "jle" => JumpKind::Jle,
            "call" => JumpKind::Call,
            _ => return None,
        })
    }

    fn build(self, target: usize) -> Instruction {
        match self {
            JumpKind::Jmp => Instruction::Jmp(target),
            JumpKind::Jeq => Instruction::Jeq(target),
            JumpKind::Jne => Instruction::Jne(target),
            JumpKind::Jgt => Instruction::Jgt(target),
            JumpKind::Jlt => Instruction::Jlt(target),
            JumpKind::Jge => Instruction::Jge(target),
            JumpKind::Jle => Instruction::Jle(target),
            JumpKind::Call => Instruction::Call(target),
        }
    }
}

/// Output of pass 1: either a finished instruction or a jump waiting for
/// its label to resolve.
#[derive(Debug)]
enum Pending {
    Done(Instruction),
    Jump { kind: JumpKind, label: String, line: usize },
}

/// Assembles EvilStack source text into a [`Program`].
pub fn assemble(source: &str) -> Result<Program, AsmErrors> {
    let mut errors = Vec::new();
    let mut pending: Vec<Pending> = Vec::new();
    let mut labels: HashMap<String, usize> = HashMap::new();

    // Pass 1: emit instructions, bind labels to the next index.
    for (i, text) in source.lines().enumerate() {
        let number = i + 1;
        let line = match lexer::lex_line(text, number) {
            Ok(line) => line,
            Err(error) => {
                errors.push(error);
                continue;
            }
        };
        match line {
            Line::Blank => {}
            Line::Label(name) => {
                if labels.insert(name.clone(), pending.len()).is_some() {
                    errors.push(AsmError::DuplicateLabel { line: number, name });
                }
            }
            Line::Instruction { mnemonic, operands } => {
                match decode(&mnemonic, operands, number) {
                    Ok(instruction) => pending.push(instruction),
                    Err(error) => errors.push(error),
                }
            }
        }
    }

    // Pass 2: resolve label operands to instruction indices.
    let mut instructions = Vec::with_capacity(pending.len());
    for entry in pending {
        match entry {
            Pending::Done(instruction) => instructions.push(instruction),
            Pending::Jump { kind, label, line } => match labels.get(&label) {
                Some(&target) => instructions.push(kind.build(target)),
                None => errors.push(AsmError::UndefinedLabel { line, name: label }),
            },
        }
    }

    if errors.is_empty() {
        Ok(Program { instructions, labels })
    } else {
        Err(AsmErrors { errors })
    }
}

fn decode(mnemonic: &str, operands: Vec<Token>, line: usize) -> Result<Pending, AsmError> {
    let arity_error = |expected: usize, found: usize| AsmError::ArityError {
        line,
        mnemonic: mnemonic.to_string(),
        expected,
        found,
    };

    if let Some(kind) = JumpKind::from_mnemonic(mnemonic) {
        let mut operands = operands;
        if operands.len() != 1 {
            return Err(arity_error(1, operands.len()));
        }
        return match operands.remove(0) {
            Token::LabelRef(label) => Ok(Pending::Jump { kind, label, line }),
            token => Err(AsmError::SyntaxError {
                line,
                message: format!("`{}` requires a label reference, found {:?}", mnemonic, token),
            }),
        };
    }

    if mnemonic == "push" {
        let mut operands = operands;
        if operands.len() != 1 {
            return Err(arity_error(1, operands.len()));
        }
        let value = match operands.remove(0) {
            Token::Integer(i) => Value::Integer(i),
            Token::Float(x) => Value::Float(x),
            Token::Text(s) => Value::Text(s),
            Token::LabelRef(name) => {
                return Err(AsmError::SyntaxError {
                    line,
                    message: format!("`push` requires a literal, found label reference `@{}`", name),
                })
            }
        };
        return Ok(Pending::Done(Instruction::Push(value)));
    }

    let instruction = match mnemonic {
        "pop" => Instruction::Pop,
        "dup" => Instruction::Dup,
        "swap" => Instruction::Swap,
        "add" => Instruction::Add,
        "sub" => Instruction::Sub,
        "mul" => Instruction::Mul,
        "div" => Instruction::Div,
        "mod" => Instruction::Mod,
        "cmp" => Instruction::Cmp,
        "ret" => Instruction::Ret,
        "exit" => Instruction::Exit,
        "store" => Instruction::Store,
        "load" => Instruction::Load,
        "atoi" => Instruction::Atoi,
        "itoa" => Instruction::Itoa,
        "itof" => Instruction::Itof,
        "ftoi" => Instruction::Ftoi,
        "print" => Instruction::Print,
        "read" => Instruction::Read,
        "rand" => Instruction::Rand,
        "time" => Instruction::Time,
        _ => {
            return Err(AsmError::UnknownMnemonic { line, mnemonic: mnemonic.to_string() })
        }
    };

    if !operands.is_empty() {
        return Err(arity_error(0, operands.len()));
    }
    Ok(Pending::Done(instruction))
}
