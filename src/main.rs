fn main() {
    if let Err(err) = crm_sheets::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
