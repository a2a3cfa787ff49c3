//! Usage output. The batch service reads no arguments, so any argument is taken as a request for help.
use std::env;

use crate::config::ENVIRONMENT_VARIABLES;

const USAGE: &str = include_str!("./cli-help.txt");

/// Prints the usage text and the settings in effect if the process was started with arguments. Returns `true` when
/// it did, and the caller should then exit without processing anything.
pub fn print_usage_if_requested() -> bool {
    if env::args_os().len() <= 1 {
        return false;
    }
    println!("\n{USAGE}");
    print!("{}", describe_settings(|name| env::var(name).ok()));
    true
}

/// One line per variable, showing its value or the default the service will fall back to.
pub fn describe_settings<F>(lookup: F) -> String
where F: Fn(&str) -> Option<String> {
    let mut out = String::from("Settings in effect:\n");
    for (name, default) in ENVIRONMENT_VARIABLES {
        let value = lookup(name).unwrap_or_else(|| format!("(unset, falls back to {default})"));
        out.push_str(&format!("  {name:<26}{value}\n"));
    }
    out
}
