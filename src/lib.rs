pub mod config;
pub mod error;
pub mod fetch;
pub mod geo;
pub mod gtfs;
pub mod output;
pub mod parser;
pub mod rank;
pub mod realtime;
pub mod resolve;

pub use error::{Error, ErrorKind, Result};

pub mod gtfs_rt {
    include!(concat!(env!("OUT_DIR"), "/transit_realtime.rs"));
}
