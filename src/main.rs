fn main() {
    if let Err(err) = pipeline_schema::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
