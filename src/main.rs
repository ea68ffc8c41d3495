use std::process;

fn main() {
    match kiln::cli::run() {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(kiln::cli::exit_code_for(&e));
        }
    }
}
