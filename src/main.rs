fn main() {
    if let Err(e) = casevault_lib::run() {
        eprintln!("casevault: {e}");
        std::process::exit(1);
    }
}
