use std::fs;
use std::path::Path;

use crate::error::{KernelError, Result};

/// Parses program text into memory cells. Cells are hex pairs separated
/// by whitespace; runs of pairs without separators ("A9018D") are split.
pub fn parse_program(text: &str) -> Result<Vec<u8>> {
    let mut program = Vec::new();

    for token in text.split_whitespace() {
        if token.len() % 2 != 0 {
            return Err(KernelError::ParseProgram { token: token.to_string() });
        }

        for i in (0..token.len()).step_by(2) {
            let invalid = || KernelError::ParseProgram {
                token: token.to_string(),
            };
            let pair = token.get(i..i + 2).ok_or_else(invalid)?;
            let value = u8::from_str_radix(pair, 16).map_err(|_| invalid())?;

            program.push(value);
        }
    }

    Ok(program)
}

pub fn load_program_file(path: &Path) -> Result<Vec<u8>> {
    let text = fs::read_to_string(path)?;
    parse_program(&text)
}
