fn main() {
    std::process::exit(probelink_lib::run())
}
