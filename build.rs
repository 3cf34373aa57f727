use std::{
    env::{var as env_var, var_os as env_var_os},
    io::{self, Write},
};

fn main() {
    if is_unix() {
        let target = TargetTriplet::fetch();
        collect_uds_features(&target);
    }
}

fn is_unix() -> bool {
    env_var_os("CARGO_CFG_UNIX").is_some()
}

/// This can define the following:
/// - `uds_supported`
/// - `sockaddr_un` header flavors:
///     - `uds_sun_len`, on the BSD family, where a length byte precedes an 8-bit `sun_family`
///     - nothing, everywhere else, where `sun_family` is a 16-bit field
#[rustfmt::skip]
fn collect_uds_features(target: &TargetTriplet) {
    let mut uds = false;
    if (target.os("linux") && target.env_any(&["gnu", "musl", "musleabi", "musleabihf", "uclibc", "ohos"]))
    || target.os_any(&["android", "emscripten", "fuchsia", "redox", "solaris", "illumos"]) {
        uds = true;
    } else if target.os_any(&[
        "freebsd", "openbsd", "netbsd", "dragonfly", "macos", "ios", "tvos", "watchos", "visionos",
        "haiku",
    ]) {
        // The BSD OS family, plus Haiku, which borrowed the BSD layout
        uds = true;
        define("uds_sun_len");
    }
    if uds {
        define("uds_supported");
    }
}

fn define(cfg: &str) {
    ldefine(&[cfg]);
}
fn ldefine(cfgs: &[&str]) {
    let stdout_ = io::stdout();
    let mut stdout = stdout_.lock();
    for i in cfgs {
        stdout.write_all(b"cargo:rustc-cfg=").unwrap();
        stdout.write_all(i.as_ref()).unwrap();
        stdout.write_all(b"\n").unwrap();
    }
}

struct TargetTriplet {
    os: String,
    env: Option<String>,
}
#[rustfmt::skip]
impl TargetTriplet {
    fn fetch() -> Self {
        Self {
            os: env_var("CARGO_CFG_TARGET_OS").unwrap(),
            env: env_var("CARGO_CFG_TARGET_ENV").ok(),
        }
    }
    fn os(&self, os: &str) -> bool { self.os == os }
    fn os_any(&self, oses: &[&str]) -> bool { oses.iter().copied().any(|x| x == self.os) }
    fn env_any(&self, envs: &[&str]) -> bool {
        if let Some(env) = self.env.as_deref() {
            envs.iter().copied().any(|x| x == env)
        } else { false }
    }
}
