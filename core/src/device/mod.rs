pub mod cassette;
pub mod piezo;
pub mod printer;
pub mod rs232;
pub mod serial;

pub use cassette::Cassette;
pub use piezo::{Piezo, PiezoMixer};
pub use printer::Printer;
pub use rs232::Rs232;
pub use serial::{SerialBridge, SerialPort};
