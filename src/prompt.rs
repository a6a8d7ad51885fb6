use crate::ui;
use std::io::{self, BufRead, Write};

/// Asks until the answer is one of the single-character `options`
/// (written like `"y/n"`). Empty input and end of input yield `default`.
pub fn choose<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    prompt: &str,
    options: &str,
    default: char,
) -> io::Result<char> {
    let valid: Vec<char> = options
        .to_lowercase()
        .chars()
        .filter(|c| *c != '/')
        .collect();

    loop {
        write!(
            out,
            "{}\n({options} [default={default}]): ",
            ui::heading(prompt)
        )?;
        out.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(default);
        }

        let answer = line.trim().to_lowercase();
        let mut chars = answer.chars();
        match (chars.next(), chars.next()) {
            (None, _) => return Ok(default),
            (Some(c), None) if valid.contains(&c) => return Ok(c),
            _ => writeln!(
                out,
                "{}",
                ui::failure(&format!("Invalid input. Please enter one of: {options}."))
            )?,
        }
    }
}

pub fn confirm<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    prompt: &str,
    default: bool,
) -> io::Result<bool> {
    let default = if default { 'y' } else { 'n' };
    Ok(choose(input, out, prompt, "y/n", default)? == 'y')
}
