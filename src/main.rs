fn main() {
    if let Err(err) = nettopo::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
