pub mod apps;
pub mod launch;
pub mod listen;
pub mod power;
pub mod send;
