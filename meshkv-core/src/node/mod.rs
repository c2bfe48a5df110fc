/*
    node - Node service and replication protocols

    Wraps the store with the TCP command protocol, best-effort peer
    replication pushes, and the periodic anti-entropy task.
*/

pub mod anti_entropy;
pub mod command;
pub mod protocol;
pub mod replicator;
pub mod server;

#[cfg(test)]
mod tests;

pub use anti_entropy::AntiEntropyTask;
pub use command::Command;
pub use protocol::{ControlFrame, ProtocolError, Response, ScoredKey, Status};
pub use replicator::Replicator;
pub use server::NodeServer;
