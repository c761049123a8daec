use std::process::ExitCode;

fn main() -> ExitCode {
    teamdraw_cli::run()
}
