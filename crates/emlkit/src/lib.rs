//! File system side of `emlkit`: unpacking messages into directories.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod unpack;
