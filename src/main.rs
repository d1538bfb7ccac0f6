fn main() {
    if let Err(err) = sas_reader_step::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
