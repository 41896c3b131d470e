use serialport::{
    DataBits, FlowControl, Parity, SerialPort, SerialPortInfo, SerialPortType, StopBits,
    available_ports,
};
use std::{
    io::{self, Read},
    time::{Duration, Instant},
};

pub const FALLBACK_PORT: &str = "/dev/ttyUSB0";

// Drop a partial line that grows past this without a newline.
const MAX_PENDING: usize = 64 * 1024;

/// Something that hands out one text line at a time.
pub trait LineSource {
    /// Next complete line, trimmed, or `None` if the read timed out.
    fn read_line(&mut self) -> io::Result<Option<String>>;

    /// Release the underlying channel. Later reads fail.
    fn close(&mut self) {}
}

/// Guess which port the base station is attached to.
pub fn find_esp_port() -> Option<String> {
    let ports = available_ports().ok()?;
    pick_port(ports)
}

fn pick_port(ports: Vec<SerialPortInfo>) -> Option<String> {
    for p in &ports {
        if let SerialPortType::UsbPort(usb) = &p.port_type {
            let product = usb.product.as_deref().unwrap_or("").to_lowercase();
            let manufacturer = usb.manufacturer.as_deref().unwrap_or("").to_lowercase();
            if product.contains("esp")
                || product.contains("cp210")
                || manufacturer.contains("espressif")
                || manufacturer.contains("silicon labs")
            {
                return Some(p.port_name.clone());
            }
        }
    }

    ports
        .into_iter()
        .map(|p| p.port_name)
        .find(|name| name.contains("ttyUSB") || name.contains("ttyACM"))
}

/// Line reader over a serial port (or any byte stream in tests).
pub struct SerialLineSource<R = Box<dyn SerialPort>> {
    port: Option<R>,
    name: String,
    timeout: Duration,
    pending: Vec<u8>,
    read_buffer: [u8; 1024],
}

impl SerialLineSource {
    /// Open `port_name` at `baud_rate`, 8N1, no flow control.
    pub fn open(port_name: &str, baud_rate: u32, timeout: Duration) -> serialport::Result<Self> {
        let mut port = serialport::new(port_name, baud_rate)
            .data_bits(DataBits::Eight)
            .flow_control(FlowControl::None)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .timeout(timeout)
            .open()?;

        port.write_data_terminal_ready(true)?;
        port.clear(serialport::ClearBuffer::Input)?;
        Ok(Self::from_reader(port, port_name, timeout))
    }
}

impl<R: Read> SerialLineSource<R> {
    pub fn from_reader(reader: R, name: &str, timeout: Duration) -> Self {
        Self {
            port: Some(reader),
            name: name.to_string(),
            timeout,
            pending: Vec::new(),
            read_buffer: [0u8; 1024],
        }
    }

    fn take_line(&mut self) -> Option<String> {
        let newline_pos = self.pending.iter().position(|&b| b == b'\n')?;
        let line: Vec<u8> = self.pending.drain(..=newline_pos).collect();
        Some(decode_dropping_invalid(&line).trim().to_string())
    }
}

impl<R: Read> LineSource for SerialLineSource<R> {
    fn read_line(&mut self) -> io::Result<Option<String>> {
        let start = Instant::now();
        loop {
            if let Some(line) = self.take_line() {
                return Ok(Some(line));
            }
            let port = self
                .port
                .as_mut()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "serial port closed"))?;
            match port.read(&mut self.read_buffer) {
                Ok(0) => return Ok(None),
                Ok(n) => {
                    self.pending.extend_from_slice(&self.read_buffer[..n]);
                    if self.pending.len() > MAX_PENDING && !self.pending.contains(&b'\n') {
                        tracing::warn!(port = %self.name, "discarding {} bytes without newline", self.pending.len());
                        self.pending.clear();
                    }
                }
                Err(ref e) if e.kind() == io::ErrorKind::TimedOut => return Ok(None),
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
            // At least one read per call, even with a zero timeout.
            if start.elapsed() >= self.timeout {
                return Ok(self.take_line());
            }
        }
    }

    fn close(&mut self) {
        self.port = None;
        self.pending.clear();
    }
}

fn decode_dropping_invalid(bytes: &[u8]) -> String {
    bytes.utf8_chunks().map(|chunk| chunk.valid()).collect()
}
