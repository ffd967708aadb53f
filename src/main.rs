use std::process::ExitCode;

fn main() -> ExitCode {
    bloodlens_lib::run()
}
