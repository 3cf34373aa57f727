use {
    crate::{
        os::unix::{
            syscall::{self, Backend, LibcSyscalls, Syscalls},
            UdStream, UdStreamListener, DEFAULT_BACKLOG,
        },
        tests::util::*,
        Error,
    },
    color_eyre::eyre::{ensure, WrapErr},
    std::{
        io,
        net::Shutdown,
        path::{Path, PathBuf},
        sync::mpsc::Sender,
    },
};

fn both_backends() -> TestResult<[&'static LibcSyscalls; 2]> {
    let dynamic = LibcSyscalls::resolve().context("dynamic backend unavailable")?;
    let linked: &'static LibcSyscalls = Box::leak(Box::new(LibcSyscalls::linked()));
    let dynamic: &'static LibcSyscalls = Box::leak(Box::new(dynamic));
    Ok([linked, dynamic])
}

#[test]
fn backends_identify_themselves() -> TestResult {
    testinit();
    let [linked, resolved] = both_backends()?;
    ensure_eq!(linked.backend(), Backend::Static);
    ensure_eq!(resolved.backend(), Backend::Dynamic);
    ensure_eq!(LibcSyscalls::new(Backend::Dynamic)?.backend(), Backend::Dynamic);
    Ok(())
}

#[test]
fn failures_carry_errno() -> TestResult {
    testinit();
    for provider in both_backends()? {
        ensure_matches!(
            provider.close(-1),
            Err(Error::Syscall { operation: "close", code: libc::EBADF })
        );
        ensure_matches!(
            provider.read(-1, &mut [0; 8]),
            Err(Error::Syscall { operation: "read", code: libc::EBADF })
        );
        let err = provider.shutdown(-1, Shutdown::Both).unwrap_err();
        ensure_eq!(err.raw_os_error(), Some(libc::EBADF));
        let expected = format!("shutdown() failed: {}", io::Error::from_raw_os_error(libc::EBADF));
        ensure_eq!(err.to_string(), expected);
    }
    Ok(())
}

#[test]
fn socket_and_close() -> TestResult {
    testinit();
    for provider in both_backends()? {
        let fd = provider.socket(libc::AF_UNIX, libc::SOCK_STREAM, 0)?;
        ensure!(fd >= 0);
        provider.close(fd)?;
    }
    Ok(())
}

#[test]
fn too_long_path_makes_no_call() -> TestResult {
    testinit();
    let path = "/tmp/".repeat(30);
    for provider in both_backends()? {
        // An invalid descriptor would yield EBADF if any call were made
        ensure_matches!(
            provider.bind(-1, Path::new(&path)),
            Err(Error::AddressTooLong { len: 150, .. })
        );
        ensure_matches!(provider.connect(-1, Path::new(&path)), Err(Error::AddressTooLong { .. }));
        ensure_matches!(provider.accept(-1, Path::new(&path)), Err(Error::AddressTooLong { .. }));
    }
    Ok(())
}

fn echo_server(provider: &'static dyn Syscalls, name_sender: Sender<PathBuf>) -> TestResult {
    let (name, listener) = listen_and_pick_name(&mut NameGen::new(make_id!()), |nm| {
        UdStreamListener::bind_with(provider, nm, DEFAULT_BACKLOG, true)
    })?;
    let _ = name_sender.send(name);
    let conn = listener.accept().context("accept failed")?;
    let mut buf = [0; 16];
    let n = conn.recv(&mut buf).context("receive failed")?;
    conn.send(&buf[..n]).context("send failed")?;
    Ok(())
}

/// Both backends can be mixed freely within a process, since they reach the same C library.
#[test]
fn backends_interoperate() -> TestResult {
    testinit();
    let [linked, resolved] = both_backends()?;
    for (server_side, client_side) in [(linked, resolved), (resolved, linked)] {
        drive_server_and_client(
            move |snd| echo_server(server_side, snd),
            |nm| {
                let conn = UdStream::connect_with(client_side, nm)?;
                conn.send(b"ping\n")?;
                let mut buf = [0; 16];
                let n = conn.recv(&mut buf)?;
                ensure_eq!(&buf[..n], b"ping\n");
                Ok(())
            },
        )?;
    }
    Ok(())
}

#[test]
fn backend_names() -> TestResult {
    testinit();
    ensure_eq!("static".parse::<Backend>(), Ok(Backend::Static));
    ensure_eq!(" Dynamic\n".parse::<Backend>(), Ok(Backend::Dynamic));
    ensure_eq!("STATIC".parse::<Backend>(), Ok(Backend::Static));
    let err = "jni".parse::<Backend>().unwrap_err();
    ensure_eq!(err.to_string(), r#"unknown syscall backend "jni", expected "static" or "dynamic""#);
    ensure_eq!(Backend::Dynamic.to_string(), "dynamic");
    ensure_eq!(Backend::default(), Backend::Static);
    Ok(())
}

/// The process-wide selection is shared with every other test in this binary, so this only
/// relies on whatever got selected first staying selected.
#[test]
fn selection_is_fixed() -> TestResult {
    testinit();
    let selected = syscall::provider()?.backend();
    ensure_eq!(syscall::selected_backend(), Some(selected));
    ensure_eq!(syscall::init(selected)?.backend(), selected);

    let other = match selected {
        Backend::Static => Backend::Dynamic,
        Backend::Dynamic => Backend::Static,
    };
    ensure_matches!(
        syscall::init(other),
        Err(Error::BackendConflict { selected: s, requested: r }) if s == selected && r == other
    );
    ensure_eq!(syscall::selected_backend(), Some(selected));
    Ok(())
}
