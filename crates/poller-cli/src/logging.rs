//! Logging - tracing subscriber の組み立て
//!
//! Sinks are switched on by the config file:
//! - console: stdout, DEBUG (narrowed by `RUST_LOG` when set)
//! - file: `file_logger.log_path`, INFO, written off-thread
//! - syslog: RFC 3164 datagrams over UDP, INFO
//!
//! The result is a [`Dispatch`] rather than a global default; the caller
//! scopes the run to it.

use std::io::{self, Write};
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::{Arc, OnceLock};

use anyhow::{Context, Result};
use chrono::Local;
use poller_core::config::{FileLoggerConfig, PollerConfig, SyslogConfig};
use tracing::{Dispatch, Level, Metadata};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

/// `user-level messages`
const SYSLOG_FACILITY: u8 = 1;
const SYSLOG_TAG: &str = "poller";

/// Keeps the file writer thread alive; drop it last.
pub struct LogGuards {
    _file: Option<WorkerGuard>,
}

pub fn build_dispatch(config: &PollerConfig, debug: bool) -> Result<(Dispatch, LogGuards)> {
    let console = config.console.enabled.then(|| {
        fmt::layer()
            .with_writer(io::stdout)
            .with_target(debug)
            .with_filter(console_filter(debug))
    });

    let (file, guard) = match config.file_logger.enabled {
        true => {
            let (layer, guard) = file_layer(&config.file_logger)?;
            (Some(layer), Some(guard))
        }
        false => (None, None),
    };

    let syslog = match config.syslog.enabled {
        true => Some(
            fmt::layer()
                .with_writer(SyslogWriter::connect(&config.syslog)?)
                .with_ansi(false)
                .without_time()
                .with_target(false)
                .with_filter(LevelFilter::INFO),
        ),
        false => None,
    };

    let subscriber = Registry::default().with(console).with(file).with(syslog);
    Ok((Dispatch::new(subscriber), LogGuards { _file: guard }))
}

/// `RUST_LOG` if set, otherwise DEBUG for this program and INFO for the
/// SDK stack. `--debug` opens everything up to DEBUG.
fn console_filter(debug: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if debug {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info,poller=debug,poller_core=debug,poller_cli=debug")
        }
    })
}

fn file_layer<S>(config: &FileLoggerConfig) -> Result<(impl Layer<S>, WorkerGuard)>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    let path = config
        .log_path
        .as_deref()
        .context("file_logger.log_path is not set")?;
    let file_name = path
        .file_name()
        .with_context(|| format!("log path {} has no file name", path.display()))?;
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| std::path::Path::new("."));
    std::fs::create_dir_all(dir)
        .with_context(|| format!("creating log directory {}", dir.display()))?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name.to_string_lossy())
        .build(dir)
        .with_context(|| format!("opening log file {}", path.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_filter(LevelFilter::INFO);
    Ok((layer, guard))
}

/// Severity (RFC 5424 numbering) for an event level.
fn severity(level: &Level) -> u8 {
    match *level {
        Level::ERROR => 3,
        Level::WARN => 4,
        Level::INFO => 6,
        Level::DEBUG | Level::TRACE => 7,
    }
}

/// `<PRI>Mmm dd hh:mm:ss HOST TAG: MSG`
fn frame(severity: u8, timestamp: &str, hostname: &str, message: &[u8]) -> Vec<u8> {
    let pri = SYSLOG_FACILITY * 8 + severity;
    let mut out = format!("<{pri}>{timestamp} {hostname} {SYSLOG_TAG}: ").into_bytes();
    out.extend_from_slice(message.trim_ascii_end());
    out
}

/// Syslog collector address, resolved on first successful lookup.
///
/// An unresolvable host only drops log lines until it resolves.
struct SyslogTarget {
    host: String,
    port: u16,
    resolved: OnceLock<SocketAddr>,
}

impl SyslogTarget {
    fn addr(&self) -> Option<SocketAddr> {
        if let Some(addr) = self.resolved.get() {
            return Some(*addr);
        }
        let addr = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .ok()?
            .find(SocketAddr::is_ipv4)?;
        Some(*self.resolved.get_or_init(|| addr))
    }
}

/// `MakeWriter` that sends one datagram per event.
#[derive(Clone)]
struct SyslogWriter {
    socket: Arc<UdpSocket>,
    target: Arc<SyslogTarget>,
    hostname: Arc<str>,
}

impl SyslogWriter {
    fn connect(config: &SyslogConfig) -> Result<Self> {
        let host = config.host.as_deref().context("syslog.host is not set")?;
        let socket = UdpSocket::bind(("0.0.0.0", 0)).context("binding syslog socket")?;
        let target = SyslogTarget {
            host: host.to_string(),
            port: config.port,
            resolved: OnceLock::new(),
        };
        if target.addr().is_none() {
            eprintln!("poller: syslog target {host}:{} does not resolve yet", config.port);
        }
        let hostname = std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
        Ok(Self {
            socket: Arc::new(socket),
            target: Arc::new(target),
            hostname: hostname.into(),
        })
    }

    fn datagram(&self, severity: u8) -> SyslogDatagram {
        SyslogDatagram {
            writer: self.clone(),
            severity,
            buf: Vec::new(),
        }
    }
}

impl<'a> MakeWriter<'a> for SyslogWriter {
    type Writer = SyslogDatagram;

    fn make_writer(&'a self) -> Self::Writer {
        self.datagram(severity(&Level::INFO))
    }

    fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
        self.datagram(severity(meta.level()))
    }
}

/// Buffers one formatted event and sends it on drop.
struct SyslogDatagram {
    writer: SyslogWriter,
    severity: u8,
    buf: Vec<u8>,
}

impl Write for SyslogDatagram {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for SyslogDatagram {
    fn drop(&mut self) {
        if self.buf.is_empty() {
            return;
        }
        let timestamp = Local::now().format("%b %e %H:%M:%S").to_string();
        let datagram = frame(self.severity, &timestamp, &self.writer.hostname, &self.buf);
        // best effort
        if let Some(addr) = self.writer.target.addr() {
            let _ = self.writer.socket.send_to(&datagram, addr);
        }
    }
}
