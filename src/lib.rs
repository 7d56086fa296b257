//! # evilstack
//! An assembler and virtual machine for EvilStack, a small stack-based
//! instruction language with assembly-like syntax.
//!
//! ## Language
//! Source text is line-oriented: one instruction or label definition per
//! line, `;` starting a comment. `name:` binds a label to the following
//! instruction and `@name` references it as a jump target. Literals are
//! integers (`42`), floats (`2.5`) and quoted text (`"hi"`).
//!
//! A program runs against an operand stack, a comparison flag set by
//! `cmp` and consumed by the conditional jumps, a call stack fed by
//! `call` and drained by `ret`, and a sparse integer-addressed heap
//! (`store`/`load`). The `print`, `read`, `rand` and `time` builtins go
//! through an [`io::Io`] collaborator supplied by the host, which keeps
//! the engine free of process-global state and makes runs reproducible
//! under test.
//!
//! ## Pipeline
//! [`asm::assemble`] turns source text into an immutable [`asm::Program`]
//! (two passes, all label references resolved to instruction indices, all
//! errors collected); [`vm::run`] executes it.
pub mod asm;
pub mod io;
pub mod lexer;
pub mod ops;
pub mod value;
pub mod vm;
