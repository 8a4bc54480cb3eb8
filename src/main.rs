use std::process::ExitCode;

fn main() -> ExitCode {
    pipematrix::cli::run()
}
