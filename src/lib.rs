pub mod error;
pub mod mac;
pub mod net;
pub mod phy;
pub mod queue;
pub mod sim;
pub mod topo;
pub mod traffic;
pub mod viz;

#[cfg(test)]
mod test;
