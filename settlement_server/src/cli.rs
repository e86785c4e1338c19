use std::{env, env::VarError};

/// The server takes no arguments. Passing any prints the help text and the current configuration.
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
    // MSE_GATEWAY_API_KEY and MSE_WEBHOOK_SECRET are never printed
    const DISPLAY_ENVS: [&str; 10] = [
        "RUST_LOG",
        "MSE_HOST",
        "MSE_PORT",
        "MSE_DATABASE_URL",
        "MSE_PLATFORM_FEE",
        "MSE_CURRENCY",
        "MSE_RAIL_MAP",
        "MSE_GATEWAY_URL",
        "MSE_WEBHOOK_SIGNATURE_HEADER",
        "MSE_PROFILE_HEADER",
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
