//! Temporal smoothing, game-logic validation, and inventory bookkeeping
//! layered on top of `vision-core`'s per-frame detection.

pub mod inventory;
pub mod temporal;
pub mod tracker;
pub mod validator;

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
