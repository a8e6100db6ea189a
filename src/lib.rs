#![allow(clippy::new_without_default)]

#[macro_use]
extern crate log;
#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate lazy_static;

pub mod api;
pub mod bus_network;
pub mod config;
pub mod logs;
pub mod renderer;
pub mod route_loader;
pub mod selection;
