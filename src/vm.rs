//! Functions for executing assembled EvilStack programs.

use std::cmp::Ordering;
use std::collections::HashMap;

use thiserror::Error;

use crate::asm::Program;
use crate::io::Io;
use crate::ops::Instruction;
use crate::value::{self, ArithOp, Value};

#[cfg(test)]
mod tests;

/// The comparison flag register.
///
/// Set by `cmp`, consumed by the conditional jumps. The flag has no
/// value until the first `cmp` of a run; branching on an unset flag is
/// an error.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Flag {
    Unset,
    Equal,
    Greater,
    Less,
}

/// An error that can occur during the execution of a single instruction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OperationError {
    #[error("stack underflow: {required} value(s) required, {depth} present")]
    StackUnderflow { required: usize, depth: usize },
    #[error("type error: {operation} is not defined for {found}")]
    TypeError { operation: &'static str, found: String },
    #[error("division by zero")]
    DivisionByZero,
    #[error("integer overflow")]
    IntegerOverflow,
    #[error("cannot convert {text:?} to an integer")]
    ConversionError { text: String },
    #[error("conditional jump before any cmp")]
    UninitializedFlag,
    #[error("ret with an empty call stack")]
    CallStackUnderflow,
    #[error("load from unmapped heap address {address}")]
    UnmappedAddress { address: i64 },
    #[error("input exhausted")]
    EndOfInput,
}

/// How an instruction affected control flow.
#[derive(Debug)]
enum Effect {
    /// Fall through to the next instruction.
    None,
    /// Redirect execution to an absolute instruction index.
    SetPc(usize),
    /// Stop the run.
    Halt,
}

/// The mutable state of one running VM instance.
///
/// Owned by exactly one run; nothing is shared between runs or between
/// VM instances.
struct State<'io, IO: Io> {
    stack: Vec<Value>,
    heap: HashMap<i64, Value>,
    flag: Flag,
    call_stack: Vec<usize>,
    pc: usize,
    instructions_run: u64,
    io: &'io mut IO,
}

impl<'io, IO: Io> State<'io, IO> {
    fn new(io: &'io mut IO) -> State<'io, IO> {
        State {
            stack: Vec::new(),
            heap: HashMap::new(),
            flag: Flag::Unset,
            call_stack: Vec::new(),
            pc: 0,
            instructions_run: 0,
            io,
        }
    }

    fn pop(&mut self) -> Result<Value, OperationError> {
        let depth = self.stack.len();
        self.stack.pop().ok_or(OperationError::StackUnderflow { required: 1, depth })
    }

    /// Pops the top two values as `(second, top)`.
    fn pop2(&mut self) -> Result<(Value, Value), OperationError> {
        let depth = self.stack.len();
        if depth < 2 {
            return Err(OperationError::StackUnderflow { required: 2, depth });
        }
        let b = self.pop()?;
        let a = self.pop()?;
        Ok((a, b))
    }

    fn pop_address(&mut self, operation: &'static str) -> Result<i64, OperationError> {
        match self.pop()? {
            Value::Integer(address) if address >= 0 => Ok(address),
            Value::Integer(address) => Err(OperationError::TypeError {
                operation,
                found: format!("negative address {}", address),
            }),
            value => Err(OperationError::TypeError {
                operation,
                found: format!("a {} address", value.type_name()),
            }),
        }
    }

    fn arith(&mut self, op: ArithOp) -> Result<(), OperationError> {
        let (a, b) = self.pop2()?;
        self.stack.push(value::arith(op, a, b)?);
        Ok(())
    }

    fn branch(&self, target: usize, taken_on: &[Flag]) -> Result<Effect, OperationError> {
        match self.flag {
            Flag::Unset => Err(OperationError::UninitializedFlag),
            flag if taken_on.contains(&flag) => Ok(Effect::SetPc(target)),
            _ => Ok(Effect::None),
        }
    }

    fn apply(&mut self, instruction: &Instruction) -> Result<Effect, OperationError> {
        match instruction {
            Instruction::Push(value) => {
                self.stack.push(value.clone());
            }
            Instruction::Pop => {
                self.pop()?;
            }
            Instruction::Dup => {
                let depth = self.stack.len();
                let top = self
                    .stack
                    .last()
                    .cloned()
                    .ok_or(OperationError::StackUnderflow { required: 1, depth })?;
                self.stack.push(top);
            }
            Instruction::Swap => {
                let (a, b) = self.pop2()?;
                self.stack.push(b);
                self.stack.push(a);
            }

            Instruction::Add => self.arith(ArithOp::Add)?,
            Instruction::Sub => self.arith(ArithOp::Sub)?,
            Instruction::Mul => self.arith(ArithOp::Mul)?,
            Instruction::Div => self.arith(ArithOp::Div)?,
            Instruction::Mod => self.arith(ArithOp::Mod)?,

            Instruction::Cmp => {
                let (a, b) = self.pop2()?;
                self.flag = match value::compare(&a, &b)? {
                    Ordering::Equal => Flag::Equal,
                    Ordering::Greater => Flag::Greater,
                    Ordering::Less => Flag::Less,
                };
            }
            Instruction::Jmp(target) => return Ok(Effect::SetPc(*target)),
            Instruction::Jeq(target) => return self.branch(*target, &[Flag::Equal]),
            Instruction::Jne(target) => return self.branch(*target, &[Flag::Greater, Flag::Less]),
            Instruction::Jgt(target) => return self.branch(*target, &[Flag::Greater]),
            Instruction::Jlt(target) => return self.branch(*target, &[Flag::Less]),
            Instruction::Jge(target) => return self.branch(*target, &[Flag::Greater, Flag::Equal]),
            Instruction::Jle(target) => return self.branch(*target, &[Flag::Less, Flag::Equal]),
            Instruction::Call(target) => {
                self.call_stack.push(self.pc + 1);
                return Ok(Effect::SetPc(*target));
            }
            Instruction::Ret => {
                let target = self.call_stack.pop().ok_or(OperationError::CallStackUnderflow)?;
                return Ok(Effect::SetPc(target));
            }
            Instruction::Exit => return Ok(Effect::Halt),

            Instruction::Store => {
                let value = self.pop()?;
                let address = self.pop_address("store")?;
                self.heap.insert(address, value);
            }
            Instruction::Load => {
                let address = self.pop_address("load")?;
                let value = self
                    .heap
                    .get(&address)
                    .cloned()
                    .ok_or(OperationError::UnmappedAddress { address })?;
                self.stack.push(value);
            }

            Instruction::Atoi => match self.pop()? {
                Value::Text(s) => match s.parse::<i64>() {
                    Ok(i) => self.stack.push(Value::Integer(i)),
                    Err(_) => return Err(OperationError::ConversionError { text: s }),
                },
                value => {
                    return Err(OperationError::TypeError {
                        operation: "atoi",
                        found: value.type_name().to_string(),
                    })
                }
            },
            Instruction::Itoa => match self.pop()? {
                Value::Integer(i) => self.stack.push(Value::Text(i.to_string())),
                value => {
                    return Err(OperationError::TypeError {
                        operation: "itoa",
                        found: value.type_name().to_string(),
                    })
                }
            },
            Instruction::Itof => match self.pop()? {
                Value::Integer(i) => self.stack.push(Value::Float(i as f64)),
                value => {
                    return Err(OperationError::TypeError {
                        operation: "itof",
                        found: value.type_name().to_string(),
                    })
                }
            },
            Instruction::Ftoi => match self.pop()? {
                Value::Float(x) => self.stack.push(Value::Integer(x.trunc() as i64)),
                value => {
                    return Err(OperationError::TypeError {
                        operation: "ftoi",
                        found: value.type_name().to_string(),
                    })
                }
            },

            Instruction::Print => {
                let value = self.pop()?;
                self.io.write(&value.to_string());
            }
            Instruction::Read => {
                let line = self.io.read_line().ok_or(OperationError::EndOfInput)?;
                self.stack.push(parse_input(&line));
            }
            Instruction::Rand => {
                let value = self.io.next_random();
                self.stack.push(Value::Integer(value));
            }
            Instruction::Time => {
                let value = self.io.now();
                self.stack.push(Value::Integer(value));
            }
        }

        Ok(Effect::None)
    }
}

/// Input parse policy for `read`: integer, then float, then text.
fn parse_input(line: &str) -> Value {
    let trimmed = line.trim();
    if let Ok(i) = trimmed.parse::<i64>() {
        return Value::Integer(i);
    }
    // Only words containing a digit are float candidates, so "inf" and
    // "nan" stay text.
    if trimmed.chars().any(|c| c.is_ascii_digit()) {
        if let Ok(x) = trimmed.parse::<f64>() {
            return Value::Float(x);
        }
    }
    Value::Text(trimmed.to_string())
}

/// Options for the EvilStack virtual machine.
#[derive(Debug, Clone, Copy)]
pub struct VmOptions {
    /// The maximum number of instructions to run before the program is
    /// stopped with an error.
    ///
    /// Set to [`u64::MAX`] to disable this limit.
    max_op_count: u64,
    /// The maximum size of the operand stack.
    max_stack_size: usize,
}

impl VmOptions {
    pub fn new(max_op_count: u64, max_stack_size: usize) -> VmOptions {
        VmOptions { max_op_count, max_stack_size }
    }
}

impl Default for VmOptions {
    fn default() -> Self {
        VmOptions { max_op_count: u64::MAX, max_stack_size: usize::MAX }
    }
}

/// An error that happened while running an EvilStack program.
///
/// Every run-time error is fatal to the run: there is no recovery
/// instruction in the language.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RunError {
    /// A specific instruction failed.
    #[error("instruction {index} ({instruction}) failed: {error}")]
    InstructionFailed {
        /// The instruction which failed.
        instruction: Instruction,
        /// The 0-based index of this instruction in the program.
        index: usize,
        /// The specific error within the instruction.
        error: OperationError,
    },
    /// The program executed more instructions than the limit specified
    /// within [`VmOptions`].
    #[error("the program ran for too long ({instruction_counter} instructions had been run)")]
    RunTooLong { instruction_counter: u64 },
    /// The operand stack outgrew the limit specified within [`VmOptions`].
    #[error("stack overflow")]
    StackOverflow,
}

/// The successful result of running an EvilStack program.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    /// The operand stack after the program has finished.
    pub stack: Vec<Value>,
    /// The number of instructions which have been run.
    pub instruction_counter: u64,
    /// The instruction pointer at the end of the program.
    pub instruction_pointer: usize,
}

/// Runs an assembled program against an I/O collaborator.
///
/// The run ends successfully when `exit` executes or when the program
/// counter moves past the last instruction; both yield status 0 at the
/// process level.
///
/// # Example
/// ```
/// use evilstack::asm::assemble;
/// use evilstack::io::ScriptedIo;
/// use evilstack::value::Value;
/// use evilstack::vm::{run, VmOptions};
///
/// let program = assemble("push 2\npush 3\nadd\n").unwrap();
/// let mut io = ScriptedIo::new();
/// let result = run(&program, &mut io, VmOptions::default()).unwrap();
/// assert_eq!(result.stack, vec![Value::Integer(5)]);
/// ```
pub fn run<IO: Io>(
    program: &Program,
    io: &mut IO,
    options: VmOptions,
) -> Result<RunResult, RunError> {
    let mut s = State::new(io);

    loop {
        let Some(instruction) = program.instructions.get(s.pc) else {
            break;
        };
        let index = s.pc;

        let effect = match s.apply(instruction) {
            Ok(effect) => effect,
            Err(error) => {
                return Err(RunError::InstructionFailed {
                    instruction: instruction.clone(),
                    index,
                    error,
                })
            }
        };

        match effect {
            Effect::None => s.pc += 1,
            Effect::SetPc(target) => s.pc = target,
            Effect::Halt => break,
        }

        s.instructions_run += 1;
        if s.instructions_run >= options.max_op_count {
            return Err(RunError::RunTooLong { instruction_counter: s.instructions_run });
        }
        // Sanity check between instructions; no single instruction grows
        // the stack by more than one value.
        if s.stack.len() > options.max_stack_size {
            return Err(RunError::StackOverflow);
        }
    }

    Ok(RunResult {
        stack: s.stack,
        instruction_counter: s.instructions_run,
        instruction_pointer: s.pc,
    })
}
