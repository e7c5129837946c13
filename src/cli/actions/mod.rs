pub mod server;

/// Actions the CLI can dispatch to.
pub enum Action {
    Server(Box<server::Args>),
}
