use std::process;

fn main() {
    env_logger::init();

    if let Err(err) = widget_host_runtime::run() {
        log::error!("widget_host fatal error: {err}");
        process::exit(1);
    }
}
