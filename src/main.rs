fn main() {
    if let Err(err) = duckconn_lib::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
