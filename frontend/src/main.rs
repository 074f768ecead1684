use std::path::PathBuf;
use std::process::exit;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;

use hx20_core::device::{Printer, SerialBridge};
use hx20_core::signal::BreakSignal;
use hx20_machines::console::Charset;
use hx20_machines::{Autoload, Hx20};

mod audio;
mod debugger;
mod pacing;
mod rom_path;
#[cfg(unix)]
mod tty;

/// Sync-counter quantum between pacing waits.
const PACING_QUANTUM: u16 = 8192;

/// Epson HX-20 portable computer emulator.
#[derive(Parser)]
#[command(name = "hx20", version, about)]
struct Args {
    /// Break into debugger on start.
    #[arg(short = 'b', long)]
    debug: bool,

    /// Warp (full speed) mode.
    #[arg(short, long)]
    warp: bool,

    /// Use LANG character set (US/FR/DE/GB/DK/SE/IT/ES).
    #[arg(short, long, value_name = "LANG", default_value = "US")]
    charset: String,

    /// Load system ROMs from DIR instead of the current directory.
    #[arg(short, long, value_name = "DIR")]
    rom_dir: Option<PathBuf>,

    /// Activate extra 16K RAM expansion.
    #[arg(short, long)]
    expansion: bool,

    /// Load option ROM into address 0x6000.
    #[arg(short, long, value_name = "ROM")]
    option_rom: Option<PathBuf>,

    /// Load file as S-record into MONITOR.
    #[arg(short, long)]
    srec: bool,

    /// Enable micro-printer output to FILE.
    #[arg(short, long, value_name = "FILE")]
    printer: Option<PathBuf>,

    /// Use TTY for external 38400 baud high speed serial.
    #[arg(short, long, value_name = "TTY")]
    tty: Option<PathBuf>,

    /// Disable piezo speaker audio.
    #[arg(short = 'a', long)]
    no_audio: bool,

    /// Use 32-bit float audio output instead of unsigned 8-bit.
    #[arg(long)]
    float_audio: bool,

    /// BASIC program text file (or S-record with -s) to load automatically.
    file: Option<PathBuf>,
}

#[cfg(unix)]
static SIGINT_PENDING: AtomicBool = AtomicBool::new(false);

#[cfg(unix)]
extern "C" fn sigint_handler(_sig: libc::c_int) {
    SIGINT_PENDING.store(true, Ordering::Release);
}

#[cfg(unix)]
fn install_sigint_handler() {
    let handler = sigint_handler as extern "C" fn(libc::c_int);
    unsafe {
        libc::signal(libc::SIGINT, handler as libc::sighandler_t);
    }
}

#[cfg(not(unix))]
fn install_sigint_handler() {}

fn sigint_pending() -> bool {
    #[cfg(unix)]
    {
        SIGINT_PENDING.swap(false, Ordering::AcqRel)
    }
    #[cfg(not(unix))]
    {
        false
    }
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let charset: Charset = match args.charset.parse() {
        Ok(charset) => charset,
        Err(e) => {
            eprintln!("{e}");
            exit(1);
        }
    };

    if args.expansion && args.option_rom.is_some() {
        eprintln!("Option ROM and RAM expansion overlaps!");
        exit(1);
    }

    let break_signal = Arc::new(BreakSignal::new());
    let mut hx20 = Hx20::new(args.expansion, charset, Arc::clone(&break_signal));

    // System ROMs, validated by CRC-32.
    let rom_dir = args.rom_dir.unwrap_or_else(|| PathBuf::from("."));
    let roms = match rom_path::load_rom_set(&rom_dir) {
        Ok(roms) => roms,
        Err(e) => {
            eprintln!("Loading of system ROMs failed: {e}");
            exit(1);
        }
    };
    if let Err(e) = hx20.load_system_roms(&roms) {
        eprintln!("Loading of system ROMs failed: {e}");
        exit(1);
    }
    log::info!("system ROMs loaded from {}", rom_dir.display());

    if let Some(path) = &args.option_rom {
        if let Err(e) = hx20.load_option_rom(path) {
            eprintln!("Loading of option ROM '{}' failed: {e}", path.display());
            exit(1);
        }
    }

    if let Some(path) = &args.printer {
        match Printer::new(path) {
            Ok(printer) => hx20.printer = Some(printer),
            Err(e) => {
                eprintln!(
                    "Printer initialization with output to '{}' failed: {e}",
                    path.display()
                );
                exit(1);
            }
        }
    }

    #[cfg(unix)]
    if let Some(path) = &args.tty {
        match tty::HostTty::open(path) {
            Ok(port) => hx20.serial = Some(SerialBridge::new(Box::new(port))),
            Err(e) => {
                eprintln!("Serial initialization failed: {e}");
                exit(1);
            }
        }
    }
    #[cfg(not(unix))]
    if args.tty.is_some() {
        eprintln!("External serial is only supported on unix hosts");
        exit(1);
    }

    // SDL audio must stay alive for the duration of the run.
    let _sdl;
    let _audio_device;
    if !args.no_audio {
        let sdl = match sdl2::init().and_then(|sdl| sdl.audio().map(|a| (sdl, a))) {
            Ok(pair) => pair,
            Err(e) => {
                eprintln!("Piezo speaker initialization failed: {e}");
                exit(1);
            }
        };
        match audio::init(&sdl.1, hx20.piezo.ring(), args.float_audio) {
            Ok(device) => {
                _sdl = Some(sdl.0);
                _audio_device = Some(device);
            }
            Err(e) => {
                eprintln!("Piezo speaker initialization failed: {e}");
                exit(1);
            }
        }
    } else {
        _sdl = None;
        _audio_device = None;
    }

    if let Some(path) = &args.file {
        let autoload = if args.srec {
            Autoload::srec(path)
        } else {
            Autoload::basic(path)
        };
        match autoload {
            Ok(autoload) => hx20.set_autoload(autoload),
            Err(e) => {
                eprintln!("Failed to open '{}' for reading: {e}", path.display());
                exit(1);
            }
        }
    }

    install_sigint_handler();
    hx20.reset();

    let mut warp_mode = args.warp;
    let mut stepping = false;
    if args.debug {
        break_signal.request_break();
    }

    let pacer = pacing::Pacer::start();

    loop {
        hx20.tick();

        if sigint_pending() {
            break_signal.request_break();
        }

        if break_signal.take() || stepping {
            if let Some(message) = break_signal.take_message() {
                println!("{message}");
            }
            match debugger::run(&mut hx20, &mut warp_mode) {
                debugger::Action::Quit => return,
                debugger::Action::Continue => stepping = false,
                debugger::Action::Step => stepping = true,
            }
        }

        if !warp_mode && !hx20.autoload_warp() && hx20.master.sync_counter > PACING_QUANTUM {
            hx20.master.sync_counter = 0;
            pacer.wait();
        }
    }
}
