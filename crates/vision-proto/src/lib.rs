//! Wire types shared with the dashboard: the per-frame state-delta JSON
//! shape, the learn-mode report, crop profiles, and the common-layout
//! catalog. `serde`-derived, snake_case on the wire.

pub mod catalog;
pub mod crop_profile;
pub mod delta;
pub mod error;
pub mod report;

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
