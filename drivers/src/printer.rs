/*++

Licensed under the Apache-2.0 license.

File Name:

    printer.rs

Abstract:

    File contains support routines and macros to print progress and
    reports, gated by verbosity.

--*/
use core::convert::Infallible;
use core::sync::atomic::{AtomicU8, Ordering};
use ufmt::{uDisplay, uWrite};

#[derive(Default)]
pub struct Printer;

impl uWrite for Printer {
    type Error = Infallible;

    /// Writes a string slice into this writer, returning whether the write succeeded.
    fn write_str(&mut self, str: &str) -> Result<(), Self::Error> {
        cfg_if::cfg_if! {
            if #[cfg(any(feature = "std", test))] {
                print!("{str}");
            } else {
                let _ = str;
            }
        }
        Ok(())
    }
}

/// Print verbosity levels
#[derive(Debug, Copy, Clone, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Verbosity {
    Info = 1,
    Debug = 2,
    Test = 3,
    Warn = 4,
    Error = 5,
    Always = 9,
}

impl Verbosity {
    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            1 => Some(Self::Info),
            2 => Some(Self::Debug),
            3 => Some(Self::Test),
            4 => Some(Self::Warn),
            5 => Some(Self::Error),
            9 => Some(Self::Always),
            _ => None,
        }
    }
}

static THRESHOLD: AtomicU8 = AtomicU8::new(Verbosity::Test as u8);

/// Set the lowest level that is still printed
pub fn set_verbosity(level: Verbosity) {
    THRESHOLD.store(level as u8, Ordering::Relaxed);
}

pub fn verbosity() -> Verbosity {
    Verbosity::from_level(THRESHOLD.load(Ordering::Relaxed)).unwrap_or(Verbosity::Test)
}

/// Whether a message at `level` passes the current threshold
pub fn enabled(level: Verbosity) -> bool {
    level as u8 >= THRESHOLD.load(Ordering::Relaxed)
}

#[macro_export]
macro_rules! cprint {
    ($($tt:tt)*) => {{
        let _ = ufmt::uwrite!(&mut $crate::printer::Printer::default(), $($tt)*);
    }}
}

#[macro_export]
macro_rules! cprintln {
    ($($tt:tt)*) => {{
        let _ = ufmt::uwriteln!(&mut $crate::printer::Printer::default(), $($tt)*);
    }}
}

/// Print when `$level` passes the verbosity threshold
#[macro_export]
macro_rules! vprint {
    ($level:expr, $($tt:tt)*) => {{
        if $crate::printer::enabled($level) {
            $crate::cprint!($($tt)*);
        }
    }}
}

#[macro_export]
macro_rules! vprintln {
    ($level:expr, $($tt:tt)*) => {{
        if $crate::printer::enabled($level) {
            $crate::cprintln!($($tt)*);
        }
    }}
}

fn hex_digit(nibble: u8) -> char {
    if nibble < 10 {
        (nibble + b'0') as char
    } else {
        (nibble - 10 + b'A') as char
    }
}

pub struct HexBytes<'a>(pub &'a [u8]);
impl uDisplay for HexBytes<'_> {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        for &x in self.0.iter() {
            f.write_char(hex_digit(x >> 4))?;
            f.write_char(hex_digit(x & 0xf))?;
        }
        Ok(())
    }
}

/// `0x`-prefixed, zero-padded hex rendering of a word
pub struct HexWord(pub u32);
impl uDisplay for HexWord {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        f.write_str("0x")?;
        HexBytes(&self.0.to_be_bytes()).fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_word() {
        let mut s = String::new();
        ufmt::uwrite!(s, "{}", HexWord(0x0004_0001)).unwrap();
        assert_eq!(s, "0x00040001");
    }

    #[test]
    fn test_hex_bytes() {
        let mut s = String::new();
        ufmt::uwrite!(s, "{}", HexBytes(&[0xde, 0xad, 0x0f])).unwrap();
        assert_eq!(s, "DEAD0F");
    }

    #[test]
    fn test_verbosity_gate() {
        set_verbosity(Verbosity::Warn);
        assert!(!enabled(Verbosity::Test));
        assert!(enabled(Verbosity::Warn));
        assert!(enabled(Verbosity::Always));
        set_verbosity(Verbosity::Info);
        assert!(enabled(Verbosity::Debug));
        assert_eq!(verbosity(), Verbosity::Info);
        set_verbosity(Verbosity::Test);
    }

    #[test]
    fn test_from_level() {
        assert_eq!(Verbosity::from_level(9), Some(Verbosity::Always));
        assert_eq!(Verbosity::from_level(6), None);
    }
}
