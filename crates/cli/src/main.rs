use std::process::ExitCode;

fn main() -> ExitCode {
    factotum_cli::run()
}
