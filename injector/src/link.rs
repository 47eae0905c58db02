use std::io::BufRead;
use std::io::BufReader;
use std::io::Write;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::Duration;

use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::EmergencyStop;
use crate::InjectorError;
use crate::Result;

const READ_TIMEOUT: Duration = Duration::from_millis(250);

/// The open serial device. Writes are serialized behind a mutex so no two
/// command lines ever interleave; the diagnostic reader runs on its own
/// thread because serial reads block.
pub struct InjectorLink {
    writer: Mutex<Box<dyn Write + Send>>,
    stop: EmergencyStop,
}

impl InjectorLink {
    /// Open the device at `path` and start the diagnostic reader. Fatal at
    /// startup when the device cannot be opened.
    pub fn open(path: &str, baud: u32, stop: EmergencyStop) -> Result<Self> {
        let port = serialport::new(path, baud)
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(|source| InjectorError::Open {
                path: path.to_string(),
                source,
            })?;
        info!("opened injector at {path} ({baud} baud)");

        match port.try_clone() {
            Ok(reader) => spawn_reader(reader, stop.clone()),
            Err(err) => warn!("injector reader disabled, could not clone port: {err}"),
        }

        Ok(Self {
            writer: Mutex::new(Box::new(port)),
            stop,
        })
    }

    /// Scan USB serial devices for one whose manufacturer string contains
    /// `needle` (case-insensitive) and return its path.
    pub fn detect(needle: &str) -> Result<String> {
        let needle_lower = needle.to_lowercase();
        for port in serialport::available_ports()? {
            if let serialport::SerialPortType::UsbPort(usb) = &port.port_type {
                let manufacturer = usb.manufacturer.as_deref().unwrap_or_default();
                if manufacturer.to_lowercase().contains(&needle_lower) {
                    info!("detected injector {} ({manufacturer})", port.port_name);
                    return Ok(port.port_name);
                }
                debug!("skipping {} ({manufacturer})", port.port_name);
            }
        }
        Err(InjectorError::NotDetected(needle.to_string()))
    }

    /// Build a link over an arbitrary writer. Used by tests and by anything
    /// that wants to capture the wire stream.
    pub fn from_writer(writer: Box<dyn Write + Send>, stop: EmergencyStop) -> Self {
        Self {
            writer: Mutex::new(writer),
            stop,
        }
    }

    /// Write one command line, CRLF-terminated. A triggered emergency stop
    /// turns this into a no-op rather than an error so in-flight loops can
    /// wind down quietly.
    pub fn write_line(&self, line: &str) -> Result<()> {
        if self.stop.is_triggered() {
            return Ok(());
        }
        let mut writer = self.lock_writer();
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\r\n")?;
        writer.flush()?;
        Ok(())
    }

    fn lock_writer(&self) -> MutexGuard<'_, Box<dyn Write + Send>> {
        match self.writer.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Log whatever the firmware prints, one line at a time. Diagnostic only;
/// nothing ever waits on these lines.
fn spawn_reader(port: Box<dyn serialport::SerialPort>, stop: EmergencyStop) {
    std::thread::spawn(move || {
        let mut reader = BufReader::new(port);
        let mut line = String::new();
        loop {
            if stop.is_triggered() {
                break;
            }
            line.clear();
            match reader.read_line(&mut line) {
                Ok(0) => {
                    debug!("injector closed its end");
                    break;
                }
                Ok(_) => {
                    let text = line.trim();
                    if !text.is_empty() {
                        debug!("injector: {text}");
                    }
                }
                Err(err) if err.kind() == std::io::ErrorKind::TimedOut => continue,
                Err(err) => {
                    warn!("injector reader stopped: {err}");
                    break;
                }
            }
        }
    });
}
