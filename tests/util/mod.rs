//! Test utilities for allocating a socket path for the server, spawning a client to connect to it,
//! and faking the syscall layer.
#![allow(dead_code, unused_macros)]

mod drive;

#[allow(unused_imports)]
pub use {drive::*, eyre::*, mock::*, namegen::*, xorshift::*};

use {
    crate::Error,
    color_eyre::eyre::WrapErr,
    std::{
        fmt::Debug,
        io,
        path::{Path, PathBuf},
    },
};

pub fn testinit() { eyre::install(); }

pub fn message(server: bool, terminator: Option<char>) -> Box<str> {
    let sc = if server { "server" } else { "client" };
    let mut msg = format!("Message from {sc}!");
    if let Some(t) = terminator {
        msg.push(t);
    }
    msg.into()
}

/// Binds to the first name from `namegen` that isn't taken.
pub fn listen_and_pick_name<L: Debug>(
    namegen: &mut NameGen,
    mut bindfn: impl FnMut(&Path) -> Result<L, Error>,
) -> TestResult<(PathBuf, L)> {
    use io::ErrorKind::*;
    let name_and_listener = namegen
        .find_map(|nm| {
            eprintln!("Trying name {nm:?}...");
            let l = match bindfn(&nm) {
                Ok(l) => l,
                Err(e) if matches!(e.kind(), AddrInUse | PermissionDenied) => {
                    eprintln!("\"{}\", skipping", e.kind());
                    return None;
                }
                Err(e) => return Some(Err(e)),
            };
            Some(Ok((nm, l)))
        })
        .unwrap() // Infinite iterator
        .context("listener bind failed")?;
    eprintln!("Listener successfully created: {name_and_listener:#?}");
    Ok(name_and_listener)
}
