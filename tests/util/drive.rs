use {
    super::TestResult,
    crate::os::unix::UdStream,
    color_eyre::eyre::{eyre, WrapErr},
    std::{
        path::{Path, PathBuf},
        sync::mpsc::{self, Sender},
        thread,
        time::Duration,
    },
};

const NAME_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs `server` on its own thread and `client` on this one, once the server has published the
/// path it listens on.
pub fn drive_server_and_client<T: Send + 'static>(
    server: impl FnOnce(Sender<PathBuf>) -> TestResult<T> + Send + 'static,
    client: impl FnOnce(&Path) -> TestResult,
) -> TestResult<T> {
    let (name_sender, name_receiver) = mpsc::channel();
    let server = thread::Builder::new()
        .name("server".to_owned())
        .spawn(move || server(name_sender))
        .context("server thread spawn failed")?;

    let client_result = match name_receiver.recv_timeout(NAME_TIMEOUT) {
        Ok(name) => {
            let rslt = client(&name);
            if rslt.is_err() {
                // Unblock the server in case it is still waiting in accept()
                let _ = UdStream::connect(&name);
            }
            rslt
        }
        Err(e) => Err(eyre!("server did not publish its name: {e}")),
    };
    let server_result = server.join().map_err(|_| eyre!("server thread panicked"))?;

    let ret = server_result.context("server failed")?;
    client_result.context("client failed")?;
    Ok(ret)
}
