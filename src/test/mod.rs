mod block_ack;
mod mac_config;
mod network;
mod phy;
mod sim_time;
mod simulator;
mod stats;
