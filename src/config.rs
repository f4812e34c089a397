use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{error::Error, link::codec::LineCodec};

fn default_device() -> String {
    "/dev/ttyACM0".into()
}

fn default_baud() -> u32 {
    9600
}

fn default_read_delimiter() -> String {
    "\r\n".into()
}

fn default_port() -> u16 {
    crate::server::DEFAULT_PORT
}

/// The configuration used for running the server.
///
/// All fields may be omitted from the file; the defaults describe a
/// device at `/dev/ttyACM0`, 9600 baud, `\r\n`-delimited lines and a
/// server on port 3000.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// The path to the serial device.
    /// Likely "/dev/ttyACMx" or "COMx".
    #[serde(default = "default_device")]
    pub device: String,

    /// The baud rate to open the device at.
    #[serde(default = "default_baud")]
    pub baud: u32,

    /// Where to split the inbound byte stream into records.
    /// The delimiter is stripped from each record.
    #[serde(default = "default_read_delimiter")]
    pub read_delimiter: String,

    /// If set, appended to every payload written to the device.
    /// If unset, payloads go out verbatim.
    #[serde(default)]
    pub write_delimiter: Option<String>,

    /// The port the server listens on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// A directory of static files to serve as the browser UI.
    /// No static files are served if unset.
    #[serde(default)]
    pub static_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device: default_device(),
            baud: default_baud(),
            read_delimiter: default_read_delimiter(),
            write_delimiter: None,
            port: default_port(),
            static_dir: None,
        }
    }
}

impl Config {
    fn ron() -> ron::Options {
        ron::Options::default()
            .with_default_extension(ron::extensions::Extensions::IMPLICIT_SOME)
            .with_default_extension(ron::extensions::Extensions::UNWRAP_NEWTYPES)
    }

    /// Deserialize a .ron file's contents.
    /// Panics if the input is not valid .ron.
    pub fn deserialize(input: &str) -> Self {
        Self::ron().from_str::<Config>(input).unwrap()
    }

    /// An example configuration with some fields filled in.
    pub fn example() -> Self {
        Self {
            device: "/dev/serial/by-id/usb-Arduino_Uno-if00".into(),
            baud: 9600,
            read_delimiter: "\r\n".into(),
            write_delimiter: None,
            port: 3000,
            static_dir: Some("view".into()),
        }
    }

    /// Serialize the configuration in a "pretty" (i.e. non-compact) fashion.
    pub fn serialize_pretty(&self) -> String {
        Self::ron()
            .to_string_pretty(self, ron::ser::PrettyConfig::default())
            .unwrap()
    }

    /// Setup a new configuration from a RON file.
    pub fn new_from_path<P: AsRef<Path>>(p: P) -> Self {
        let s = std::fs::read_to_string(p).unwrap();

        Self::deserialize(&s)
    }

    /// The framing codec this configuration describes.
    pub(crate) fn codec(&self) -> LineCodec {
        LineCodec::new(
            self.read_delimiter.as_bytes(),
            self.write_delimiter
                .as_ref()
                .map(|delimiter| delimiter.as_bytes().to_vec()),
        )
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        if self.device.is_empty() {
            return Err(Error::BadConfig(
                "The device path is empty. Please point it at a serial device.".into(),
            ));
        }

        if self.baud == 0 {
            return Err(Error::BadConfig(
                "A baud rate of zero is not usable. Common rates: 9600, 115200.".into(),
            ));
        }

        if self.read_delimiter.is_empty() {
            return Err(Error::BadConfig(
                "The read delimiter is empty. Records would never be framed.".into(),
            ));
        }

        Ok(())
    }
}
