use std::{env, env::VarError};

/// There's no real CLI for the server. Any argument prints the help and the current configuration instead.
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // Be explicit about which envars to print, so as to avoid accidentally exposing secrets
    const DISPLAY_ENVS: [&str; 14] = [
        "RUST_LOG",
        "FEST_HOST",
        "FEST_PORT",
        "FEST_DATABASE_URL",
        "FEST_DB_MAX_CONNECTIONS",
        "FEST_IDENTITY_CHECKS",
        "FEST_GATEWAY_URL",
        "FEST_GATEWAY_KEY_ID",
        "FEST_CURRENCY",
        "FEST_OCR_URL",
        "FEST_OCR_TIMEOUT_SECS",
        "FEST_ASSET_BASE_URL",
        "FEST_ALLOW_COUNTER_CASH",
        "FEST_EVENT_BUFFER_SIZE",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
