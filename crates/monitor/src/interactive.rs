//! Interactive device inspection
//!
//! Lists attached devices, reads one numeric selection and prints the full
//! detail block for it. Input and output are generic so the whole exchange
//! can be driven from tests.

use crate::display::{detail_block, detail_title, list_line};
use crate::error::{MonitorError, Result};
use common::format_iso8601;
use inventory::{DeviceDescriptor, DeviceIdentity};
use std::io::{BufRead, Write};
use std::time::SystemTime;

const RULE: &str = "---------------------------------------------------";

/// A parsed selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Exit,
    /// Zero-based index into the device list
    Device(usize),
}

/// How an inspection session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionOutcome {
    /// User entered 0
    Exited,
    /// Detail block printed for this device
    Shown(DeviceIdentity),
    NoDevices,
}

impl SelectionOutcome {
    pub fn exit_code(&self) -> u8 {
        match self {
            SelectionOutcome::Exited | SelectionOutcome::Shown(_) => 0,
            SelectionOutcome::NoDevices => 1,
        }
    }
}

/// Parse one line of user input against a list of `count` devices
pub fn parse_selection(line: &str, count: usize) -> Result<Selection> {
    let invalid = || MonitorError::MalformedInput("Invalid selection.".to_string());
    let text = line.trim();

    let choice: i64 = match text.parse() {
        Ok(n) => n,
        // Too many digits for i64 is still a number, just never in range
        Err(_) if is_integer(text) => return Err(invalid()),
        Err(_) => {
            return Err(MonitorError::MalformedInput(
                "Please enter a valid number.".to_string(),
            ));
        }
    };

    match choice {
        0 => Ok(Selection::Exit),
        n if n >= 1 && (n as u64) <= count as u64 => Ok(Selection::Device(n as usize - 1)),
        _ => Err(invalid()),
    }
}

fn is_integer(text: &str) -> bool {
    let digits = text.strip_prefix(['+', '-']).unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Run one list / select / detail exchange
///
/// A malformed selection is printed and returned as
/// [`MonitorError::MalformedInput`].
pub fn run_selection<R: BufRead, W: Write>(
    devices: &[DeviceDescriptor],
    mut input: R,
    mut out: W,
) -> Result<SelectionOutcome> {
    writeln!(
        out,
        "usb-watch - USB Device Information Tool (v{}, {})",
        env!("CARGO_PKG_VERSION"),
        format_iso8601(SystemTime::now())
    )?;
    writeln!(out, "{}", RULE)?;

    if devices.is_empty() {
        writeln!(out, "No USB devices found.")?;
        return Ok(SelectionOutcome::NoDevices);
    }

    writeln!(out, "\nConnected USB Devices:")?;
    for (i, desc) in devices.iter().enumerate() {
        writeln!(out, "{}", list_line(i + 1, desc))?;
    }

    write!(out, "\nSelect a device number to view details (or 0 to exit): ")?;
    out.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;

    match parse_selection(&line, devices.len()) {
        Ok(Selection::Exit) => {
            writeln!(out, "Exiting...")?;
            Ok(SelectionOutcome::Exited)
        }
        Ok(Selection::Device(index)) => {
            let desc = &devices[index];
            writeln!(out, "\n{}", detail_title(desc))?;
            writeln!(out, "{}", RULE)?;
            writeln!(out, "{}", detail_block(desc))?;
            Ok(SelectionOutcome::Shown(desc.identity()))
        }
        Err(e) => {
            writeln!(out, "{}", e)?;
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_selection() {
        assert_eq!(parse_selection("0\n", 3).unwrap(), Selection::Exit);
        assert_eq!(parse_selection(" 2 ", 3).unwrap(), Selection::Device(1));
        assert_eq!(parse_selection("3", 3).unwrap(), Selection::Device(2));
    }

    #[test]
    fn test_parse_selection_errors() {
        let err = parse_selection("4", 3).unwrap_err();
        assert_eq!(err.to_string(), "Invalid selection.");

        let err = parse_selection("-1", 3).unwrap_err();
        assert_eq!(err.to_string(), "Invalid selection.");

        let err = parse_selection("99999999999999999999", 3).unwrap_err();
        assert_eq!(err.to_string(), "Invalid selection.");

        let err = parse_selection("-99999999999999999999", 3).unwrap_err();
        assert_eq!(err.to_string(), "Invalid selection.");

        let err = parse_selection("12a", 3).unwrap_err();
        assert_eq!(err.to_string(), "Please enter a valid number.");

        let err = parse_selection("abc", 3).unwrap_err();
        assert_eq!(err.to_string(), "Please enter a valid number.");

        // End of input reads as an empty line
        assert!(matches!(
            parse_selection("", 3),
            Err(MonitorError::MalformedInput(_))
        ));
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(SelectionOutcome::Exited.exit_code(), 0);
        assert_eq!(SelectionOutcome::NoDevices.exit_code(), 1);
    }
}
