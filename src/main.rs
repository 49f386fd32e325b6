use std::process::exit;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(err) = cxapp::run() {
        eprintln!("{err:#}");
        exit(1);
    }
}
