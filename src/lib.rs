pub mod block;
pub mod client;
pub mod cmd;
pub mod control;
pub mod error;
pub mod fault;
pub mod proxy;
pub mod server;
pub mod target;
pub mod utils;

#[cfg(test)]
extern crate quickcheck;
#[cfg(test)]
#[macro_use(quickcheck)]
extern crate quickcheck_macros;
