use corvid::uci::UciController;

#[cfg(feature = "cli")]
fn init_logging() {
    corvid::logger::init_logging("logs/corvid.log", "corvid=info");
}

#[cfg(not(feature = "cli"))]
fn init_logging() {}

fn main() {
    init_logging();
    UciController::new().run();
}
