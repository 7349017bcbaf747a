#![deny(unsafe_code)]

pub mod apple;
pub mod cli;
pub mod doctor;
pub mod env;
pub mod invoke;
pub mod opts;
pub mod project;
pub mod util;

pub static NAME: &str = "cordova-apple";
