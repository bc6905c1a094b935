//! The network and file-output boundary: blocking HTTP POST/PUT of state
//! deltas, learn reports, and crop profiles; JPEG snapshot and JSON report
//! file writers. Synchronous, single-threaded, per §A.5.

pub mod client;
pub mod error;
pub mod report_writer;
pub mod snapshot;

#[cfg(test)]
mod tests {
    use ctor::ctor;
    use tracing::Level;
    use tracing_subscriber::FmtSubscriber;

    #[ctor]
    fn init_tracing() {
        let subscriber = FmtSubscriber::builder()
            .with_file(true)
            .with_line_number(true)
            .with_max_level(Level::TRACE)
            .pretty()
            .finish();
        tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");
    }
}
