#![allow(clippy::exit, clippy::incompatible_msrv)]
use std::ffi::{c_char, c_int, c_long, c_short};

macro_rules! bitwidths {
    ($($nam:ident),+ $(,)?) => {[$((stringify!($nam), $nam::BITS)),+]};
}
#[allow(unused_macros)]
macro_rules! sizes {
    ($($nam:ident),+ $(,)?) => {[$((stringify!($nam), ::std::mem::size_of::<$nam>())),+]};
}

mod util;
#[cfg(unix)]
mod unix;

use util::*;

fn main() {
    print_bitwidths(&bitwidths!(usize, c_char, c_short, c_int, c_long));
    println!();
    #[cfg(unix)]
    unix::main();
    #[cfg(not(unix))]
    println!("Not a Unix system, no further information will be gathered.");
}
