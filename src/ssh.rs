use std::io::{self, Read};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use socket2::{SockRef, TcpKeepalive};
use ssh2::{Channel, Session};

use crate::config::{Auth, Config};

const SSH_USER: &str = "root";
const SSH_PORT: u16 = 22;

/// Timeout for connecting and for the handshake/auth exchange.
const SSH_TIMEOUT: Duration = Duration::from_secs(5);

const KEEPALIVE_IDLE: Duration = Duration::from_secs(10);
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(5);

/// A remote `cat` of an input device. Holds the session so the channel
/// stays open for as long as the stream lives.
pub struct InputStream {
    channel: Channel,
    // Dropped after `channel`.
    _session: Session,
}

impl Read for InputStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.channel.read(buf)
    }
}

/// Open an SSH connection and stream raw events from a device file.
///
/// Reads on the returned stream time out after `config.read_timeout_ms`
/// so callers can do housekeeping while the tablet is idle.
pub fn open_input_stream(
    device_path: &str,
    config: &Config,
) -> Result<InputStream, Box<dyn std::error::Error + Send + Sync>> {
    log::info!("Connecting to {} for {}", config.host, device_path);

    let session = connect(config)?;

    let mut channel = session.channel_session()?;
    let cmd = format!("cat {}", device_path);
    log::debug!("Executing: {}", cmd);
    channel.exec(&cmd)?;

    session.set_timeout(config.read_timeout_ms);

    log::info!("Stream ready for {}", device_path);
    Ok(InputStream {
        channel,
        _session: session,
    })
}

/// Open an authenticated session, e.g. for device probing.
pub fn connect(config: &Config) -> Result<Session, Box<dyn std::error::Error + Send + Sync>> {
    let addr = (config.host.as_str(), SSH_PORT)
        .to_socket_addrs()?
        .next()
        .ok_or("Could not resolve host address")?;
    let tcp = TcpStream::connect_timeout(&addr, SSH_TIMEOUT)?;
    enable_keepalive(&tcp);

    let mut session = Session::new()?;
    session.set_tcp_stream(tcp);
    session.set_timeout(SSH_TIMEOUT.as_millis() as u32);
    session.handshake()?;
    authenticate(&mut session, &config.auth())?;
    // Probing and exec block without limit; streams set their own timeout.
    session.set_timeout(0);

    Ok(session)
}

/// Detect a vanished tablet (cable pulled, sleep) instead of waiting forever.
fn enable_keepalive(tcp: &TcpStream) {
    let keepalive = TcpKeepalive::new()
        .with_time(KEEPALIVE_IDLE)
        .with_interval(KEEPALIVE_INTERVAL);
    if let Err(e) = SockRef::from(tcp).set_tcp_keepalive(&keepalive) {
        log::warn!("Could not enable TCP keepalive: {}", e);
    }
}

fn authenticate(
    session: &mut Session,
    auth: &Auth,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    match auth {
        Auth::Key(path) => {
            log::debug!("Authenticating with key {}", path.display());
            session.userauth_pubkey_file(SSH_USER, None, path.as_ref(), None)?;
        }
        Auth::Password(pass) => {
            session.userauth_password(SSH_USER, pass)?;
        }
        Auth::Agent => {
            log::debug!("Authenticating with ssh-agent");
            session.userauth_agent(SSH_USER)?;
        }
    }

    if !session.authenticated() {
        return Err("SSH authentication failed".into());
    }

    Ok(())
}
