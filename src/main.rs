fn main() {
    if let Err(err) = flacjack::run() {
        eprintln!("fatal: {err:#}");
        std::process::exit(1);
    }
}
