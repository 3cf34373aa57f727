#![cfg_attr(not(unix), allow(dead_code))]

use std::fmt::{Display, LowerHex};

fn maxlen<T>(a: &[(&str, T)]) -> usize { a.iter().map(|&(nm, _)| nm.len()).max().unwrap_or(0) }

pub fn print_bitwidths(bw: &[(&str, u32)]) {
    let width = maxlen(bw);
    bw.iter().for_each(|&(nm, bw)| println!("{nm:width$} : {bw:>2} bits"));
}
pub fn print_sizes(sz: &[(&str, usize)]) {
    let width = maxlen(sz);
    sz.iter().for_each(|&(nm, sz)| println!("{nm:width$} : {sz:>3} bytes"));
}
pub fn print_hex<T: LowerHex>(nm: &str, bytes: &[T]) {
    print!("{nm} :");
    bytes.iter().for_each(|b| print!(" {b:02x}"));
    println!();
}

pub trait ResultExt: Sized {
    type Ok;
    type Err: Display;
    fn get_err(&self) -> Option<&Self::Err>;
    fn unwrap_or_else(self, f: impl FnOnce(Self::Err) -> Self::Ok) -> Self::Ok;

    fn report_error(self, msg: &str) -> Self {
        if let Some(e) = self.get_err() {
            println!("{msg}: {e}");
        }
        self
    }
    fn unwrap_or_exit(self, msg: &str) -> Self::Ok {
        self.report_error(msg).unwrap_or_else(forget_error_and_die)
    }
}
fn forget_error_and_die<T, E>(e: E) -> T {
    std::mem::forget(e);
    std::process::exit(1);
}
impl<T, E: Display> ResultExt for Result<T, E> {
    type Ok = T;
    type Err = E;
    fn get_err(&self) -> Option<&E> { self.as_ref().err() }
    fn unwrap_or_else(self, f: impl FnOnce(E) -> T) -> T { self.unwrap_or_else(f) }
}
