pub mod login;
pub mod pull;
pub mod reauth;
pub mod refresh;
pub mod status;
pub mod watch;

use std::io::Write as IoWrite;

/// Read one line of operator input with a prompt.
pub(crate) fn prompt(label: &str) -> String {
    print!("{}", label);
    std::io::stdout().flush().ok();
    let mut line = String::new();
    std::io::stdin().read_line(&mut line).unwrap_or(0);
    line.trim().to_string()
}
