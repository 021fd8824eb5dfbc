fn main() {
    if let Err(err) = trade_dashboard::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
