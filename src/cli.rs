//! Command-line argument parsing for ringsync

pub struct Args {
    pub once: bool,
    pub validate: bool,
    pub help: bool,
}

pub fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    parse_from(&args)
}

fn parse_from(args: &[String]) -> Args {
    let mut result = Args {
        once: false,
        validate: false,
        help: false,
    };

    for arg in args.iter().skip(1) {
        match arg.as_str() {
            "--once" => result.once = true,
            "--validate" => result.validate = true,
            "--help" | "-h" => result.help = true,
            _ => {}
        }
    }

    result
}

pub fn print_help() {
    println!("ringsync - On-call schedule to PBX ring-group sync\n");
    println!("USAGE:");
    println!("    ringsync [OPTIONS]\n");
    println!("OPTIONS:");
    println!("    --once              Run a single reconciliation cycle and exit");
    println!("    --validate          Validate configuration and exit");
    println!("    --help, -h          Show this help message\n");
    println!("ENVIRONMENT:");
    println!("    See .env.example for required configuration variables");
}
