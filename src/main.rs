fn main() {
    if let Err(err) = hanzi_daily_lib::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
