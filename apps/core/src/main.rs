fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let options = match beacon_core::runtime::parse_cli_args(&args) {
        Ok(options) => options,
        Err(error) => {
            eprintln!("[beacon-core] {error}");
            std::process::exit(2);
        }
    };

    if let Err(error) = beacon_core::runtime::run_with_options(options) {
        eprintln!("[beacon-core] runtime failed: {error}");
        std::process::exit(1);
    }
}
