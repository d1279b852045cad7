use std::io::{self, BufRead, Write};

/// Ask a yes/no question on stdout. An empty answer picks `default`;
/// anything unrecognised asks again. End of input counts as "no".
pub fn prompt_confirm(prompt: &str, default: bool) -> io::Result<bool> {
    let stdin = io::stdin();
    let mut input = String::new();

    loop {
        input.clear();
        if default {
            print!("{} (Y/n): ", prompt);
        } else {
            print!("{} (y/N): ", prompt);
        }
        io::stdout().flush()?;

        if stdin.lock().read_line(&mut input)? == 0 {
            return Ok(false);
        }

        match input.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            "" => return Ok(default),
            _ => continue,
        }
    }
}
