//! The line scanner for EvilStack source text.
//!
//! EvilStack is line-oriented: each source line holds at most one
//! instruction or one label definition. The lexer classifies a single
//! line; the assembler drives it over the whole file.

use crate::asm::AsmError;

/// One classified operand token.
#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    Integer(i64),
    Float(f64),
    Text(String),
    /// An `@name` reference, resolved to an instruction index in pass 2.
    LabelRef(String),
}

/// The classification of one source line.
#[derive(Clone, Debug, PartialEq)]
pub enum Line {
    /// Blank or comment-only; emits nothing.
    Blank,
    /// A `name:` definition binding the next instruction index.
    Label(String),
    Instruction { mnemonic: String, operands: Vec<Token> },
}

/// Scans one source line. `number` is the 1-based line number used in
/// diagnostics.
///
/// Comments start at `;` outside of string literals and run to the end
/// of the line. String literals run to the closing quote and may contain
/// spaces and `;`; there are no escape sequences.
pub fn lex_line(line: &str, number: usize) -> Result<Line, AsmError> {
    let words = split_words(line, number)?;
    let Some((first, rest)) = words.split_first() else {
        return Ok(Line::Blank);
    };

    if let Word::Bare(name) = first {
        if let Some(label) = name.strip_suffix(':') {
            if label.is_empty() {
                return Err(AsmError::SyntaxError {
                    line: number,
                    message: "label definition with an empty name".to_string(),
                });
            }
            if !rest.is_empty() {
                return Err(AsmError::SyntaxError {
                    line: number,
                    message: format!("unexpected tokens after label `{}:`", label),
                });
            }
            return Ok(Line::Label(label.to_string()));
        }
    }

    let mnemonic = match first {
        Word::Bare(mnemonic) => mnemonic.clone(),
        Word::Quoted(_) => {
            return Err(AsmError::SyntaxError {
                line: number,
                message: "a line cannot start with a string literal".to_string(),
            })
        }
    };

    let mut operands = Vec::new();
    for word in rest {
        operands.push(classify_operand(word, number)?);
    }

    Ok(Line::Instruction { mnemonic, operands })
}

/// A whitespace-separated word, with string literals kept whole.
#[derive(Debug)]
enum Word {
    Bare(String),
    Quoted(String),
}

fn split_words(line: &str, number: usize) -> Result<Vec<Word>, AsmError> {
    let mut words = Vec::new();
    let mut chars = line.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c == ';' {
            break;
        } else if c == '"' {
            chars.next();
            let mut text = String::new();
            loop {
                match chars.next() {
                    Some('"') => break,
                    Some(c) => text.push(c),
                    None => {
                        return Err(AsmError::SyntaxError {
                            line: number,
                            message: "unterminated string literal".to_string(),
                        })
                    }
                }
            }
            words.push(Word::Quoted(text));
        } else {
            let mut word = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() || c == ';' {
                    break;
                }
                word.push(c);
                chars.next();
            }
            words.push(Word::Bare(word));
        }
    }

    Ok(words)
}

fn classify_operand(word: &Word, number: usize) -> Result<Token, AsmError> {
    let word = match word {
        Word::Quoted(text) => return Ok(Token::Text(text.clone())),
        Word::Bare(word) => word,
    };

    if let Some(name) = word.strip_prefix('@') {
        if name.is_empty() {
            return Err(AsmError::SyntaxError {
                line: number,
                message: "label reference with an empty name".to_string(),
            });
        }
        return Ok(Token::LabelRef(name.to_string()));
    }

    let numeric = word.strip_prefix('-').unwrap_or(word);
    if !numeric.is_empty() && numeric.chars().all(|c| c.is_ascii_digit() || c == '.') {
        if numeric.contains('.') {
            if let Ok(x) = word.parse::<f64>() {
                return Ok(Token::Float(x));
            }
        } else if let Ok(i) = word.parse::<i64>() {
            return Ok(Token::Integer(i));
        }
    }

    Err(AsmError::SyntaxError {
        line: number,
        message: format!("cannot classify operand `{}`", word),
    })
}
