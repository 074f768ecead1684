pub mod autoload;
pub mod console;
pub mod hx20;
pub mod rom_loader;

pub use autoload::Autoload;
pub use console::{Charset, Console};
pub use hx20::Hx20;
pub use rom_loader::{RomLoadError, SystemRoms};
