use std::path::PathBuf;

use wall_tui::RunOptions;

fn main() {
    let opts = match parse_cli_flags() {
        Some(opts) => opts,
        None => return,
    };

    if let Err(err) = wall_tui::run(opts) {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}

/// Returns `None` when a flag was handled and the program should exit.
fn parse_cli_flags() -> Option<RunOptions> {
    let mut opts = RunOptions::default();
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("Wall-TUI {}", wall_tui::VERSION);
                return None;
            }
            "--help" | "-h" => {
                println!(
                    "Wall-TUI - A personal wall feed in the terminal.\n\n  --version, -V        Show version and exit\n  --help,    -h        Show this help message\n  --config <path>      Read configuration from <path>\n  --ephemeral          Keep posts in memory only\n  --print              Print the wall and exit"
                );
                return None;
            }
            "--config" => match args.next() {
                Some(path) => opts.config_file = Some(PathBuf::from(path)),
                None => {
                    eprintln!("error: --config requires a path");
                    std::process::exit(2);
                }
            },
            "--ephemeral" => opts.ephemeral = true,
            "--print" => opts.print = true,
            other => {
                eprintln!("warning: ignoring unknown argument {other}");
            }
        }
    }
    Some(opts)
}
