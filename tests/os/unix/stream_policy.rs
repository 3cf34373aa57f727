//! End-of-stream, dropped-write and short-write policies of streams and listeners, checked against
//! a fake syscall layer.

use {
    crate::{
        os::unix::{UdStream, UdStreamListener, DEFAULT_BACKLOG},
        tests::util::*,
        Error,
    },
    color_eyre::eyre::ensure,
    std::{
        io::{self, prelude::*},
        net::Shutdown,
        path::Path,
        sync::atomic::Ordering::SeqCst,
    },
};

fn connect(mock: MockSyscalls) -> TestResult<(UdStream, &'static MockSyscalls)> {
    let mock = mock.leak();
    Ok((UdStream::connect_with(mock, Path::new("/mock.sock"))?, mock))
}

#[test]
fn short_write_is_an_error() -> TestResult {
    testinit();
    let (stream, mock) = connect(MockSyscalls { short_write_by: 2, ..Default::default() })?;
    ensure_matches!(stream.send(b"hello"), Err(Error::ShortWrite { requested: 5, written: 3 }));
    ensure_eq!(mock.writes.load(SeqCst), 1, "short writes must not be retried");

    let err = (&stream).write(b"hello").unwrap_err();
    ensure_eq!(err.kind(), io::ErrorKind::WriteZero);
    ensure_matches!(
        err.get_ref().and_then(|e| e.downcast_ref::<Error>()),
        Some(Error::ShortWrite { .. })
    );
    Ok(())
}

#[test]
fn full_write_succeeds() -> TestResult {
    testinit();
    let (mut stream, mock) = connect(MockSyscalls::default())?;
    stream.send(b"hello")?;
    ensure_eq!(stream.write(b"hello")?, 5);
    stream.flush()?;
    ensure_eq!(mock.writes.load(SeqCst), 2);
    Ok(())
}

#[test]
fn read_delivers_what_the_call_returned() -> TestResult {
    testinit();
    let (stream, mock) = connect(MockSyscalls::default())?;
    let mut buf = [0; 4];
    ensure_eq!(stream.recv(&mut buf)?, 4);
    ensure_eq!(&buf, b"mmmm");
    ensure_eq!(mock.reads.load(SeqCst), 1);
    Ok(())
}

#[test]
fn zero_length_io_makes_no_calls() -> TestResult {
    testinit();
    let (stream, mock) = connect(MockSyscalls::default())?;
    ensure_eq!(stream.recv(&mut [])?, 0);
    stream.send(&[])?;
    ensure_eq!(mock.reads.load(SeqCst), 0);
    ensure_eq!(mock.writes.load(SeqCst), 0);
    Ok(())
}

#[test]
fn closed_stream_reads_eof_and_drops_writes() -> TestResult {
    testinit();
    let (mut stream, mock) = connect(MockSyscalls::default())?;
    stream.close()?;
    ensure!(stream.is_closed());

    ensure_eq!(stream.recv(&mut [0; 16])?, 0);
    let mut rest = Vec::new();
    ensure_eq!(stream.read_to_end(&mut rest)?, 0);

    stream.send(b"lost")?;
    stream.write_all(b"also lost")?;
    stream.shutdown(Shutdown::Both)?;
    stream.close()?;

    ensure_eq!(mock.reads.load(SeqCst), 0);
    ensure_eq!(mock.writes.load(SeqCst), 0);
    ensure_eq!(mock.shutdowns.load(SeqCst), 0);
    ensure_eq!(mock.closes(), 1);
    Ok(())
}

#[test]
fn shutdown_keeps_descriptor_open() -> TestResult {
    testinit();
    let (stream, mock) = connect(MockSyscalls::default())?;
    stream.shutdown(Shutdown::Write)?;
    ensure_eq!(mock.shutdowns.load(SeqCst), 1);
    ensure!(!stream.is_closed());
    ensure_eq!(mock.closes(), 0);
    Ok(())
}

#[test]
fn failed_connect_closes_socket() -> TestResult {
    testinit();
    let mock = MockSyscalls { fail_connect: true, ..Default::default() }.leak();
    let err = UdStream::connect_with(mock, Path::new("/mock.sock")).unwrap_err();
    ensure_matches!(err, Error::Syscall { operation: "connect", .. });
    ensure_eq!(mock.closes(), 1, "socket leaked after a failed connect");
    Ok(())
}

#[test]
fn too_long_path_closes_socket() -> TestResult {
    testinit();
    let mock = MockSyscalls::default().leak();
    let path = "/".repeat(200);
    let err = UdStream::connect_with(mock, Path::new(&path)).unwrap_err();
    ensure_matches!(err, Error::AddressTooLong { len: 200, capacity: 104 });
    ensure_eq!(mock.closes(), 1);
    Ok(())
}

#[test]
fn failed_listen_closes_socket() -> TestResult {
    testinit();
    let mock = MockSyscalls { fail_listen: true, ..Default::default() }.leak();
    let err = UdStreamListener::bind_with(mock, Path::new("/mock.sock"), DEFAULT_BACKLOG, false)
        .unwrap_err();
    ensure_matches!(err, Error::Syscall { operation: "listen", .. });
    ensure_eq!(mock.closes(), 1);
    Ok(())
}

#[test]
fn closed_listener_refuses_to_accept() -> TestResult {
    testinit();
    let mock = MockSyscalls::default().leak();
    let listener = UdStreamListener::bind_with(mock, Path::new("/mock.sock"), 1, false)?;
    let conn = listener.accept()?;
    listener.close()?;
    ensure!(listener.is_closed());
    ensure_matches!(listener.accept(), Err(Error::HandleClosed));
    ensure_matches!(listener.incoming().next(), Some(Err(Error::HandleClosed)));
    ensure!(!conn.is_closed(), "accepted connections outlive the listener");
    ensure_eq!(mock.closes(), 1);
    Ok(())
}

#[test]
fn halves_share_one_descriptor() -> TestResult {
    testinit();
    let (stream, mock) = connect(MockSyscalls::default())?;
    let (recver, sender) = stream.split();
    sender.send(b"hi")?;
    ensure_eq!(recver.recv(&mut [0; 2])?, 2);

    recver.close()?;
    ensure!(sender.as_stream().is_closed());
    sender.send(b"dropped")?;
    ensure_eq!(mock.writes.load(SeqCst), 1);

    drop((recver, sender));
    ensure_eq!(mock.closes(), 1);
    Ok(())
}

#[test]
fn adopted_descriptor_is_closed_once() -> TestResult {
    testinit();
    let mock = MockSyscalls::default().leak();
    // SAFETY: the mock does not own any real descriptors
    let stream = unsafe { UdStream::from_raw_fd_with(mock, 42) };
    ensure_eq!(stream.as_refcounted_fd().with(|raw| raw), Some(42));
    ensure_eq!(stream.recv(&mut [0; 3])?, 3);
    stream.close()?;
    drop(stream);
    ensure_eq!(*mock.closed.lock().unwrap(), [42]);
    Ok(())
}
