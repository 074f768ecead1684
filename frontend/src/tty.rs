//! Host TTY backend for the external serial bridge: the device is opened
//! raw at 38,400 baud 8N1 with non-blocking reads and writes.

#![cfg(unix)]

use std::ffi::CString;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use hx20_core::device::SerialPort;

pub struct HostTty {
    fd: libc::c_int,
}

impl HostTty {
    pub fn open(path: &Path) -> io::Result<Self> {
        let c_path = CString::new(path.as_os_str().as_bytes())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "path contains NUL"))?;

        let fd = unsafe {
            libc::open(
                c_path.as_ptr(),
                libc::O_RDWR | libc::O_NOCTTY | libc::O_NONBLOCK,
            )
        };
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }

        let mut tios = unsafe { std::mem::zeroed::<libc::termios>() };
        if unsafe { libc::tcgetattr(fd, &mut tios) } == -1 {
            let err = io::Error::last_os_error();
            unsafe { libc::close(fd) };
            return Err(err);
        }

        unsafe {
            libc::cfmakeraw(&mut tios);
            libc::cfsetispeed(&mut tios, libc::B38400);
            libc::cfsetospeed(&mut tios, libc::B38400);
        }

        if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &tios) } == -1 {
            let err = io::Error::last_os_error();
            unsafe { libc::close(fd) };
            return Err(err);
        }

        Ok(Self { fd })
    }
}

impl SerialPort for HostTty {
    fn read_byte(&mut self) -> Option<u8> {
        let mut byte = 0u8;
        let n = unsafe { libc::read(self.fd, &mut byte as *mut u8 as *mut libc::c_void, 1) };
        (n == 1).then_some(byte)
    }

    fn write_byte(&mut self, byte: u8) -> bool {
        let n = unsafe { libc::write(self.fd, &byte as *const u8 as *const libc::c_void, 1) };
        n == 1
    }
}

impl Drop for HostTty {
    fn drop(&mut self) {
        unsafe { libc::close(self.fd) };
    }
}
