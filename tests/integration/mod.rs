//! Integration tests for sqlrun.

pub mod batch_test;
pub mod cli_test;
pub mod export_test;
pub mod postgres_test;
pub mod script_test;

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

/// A writer whose contents stay readable after it is handed to a sink.
#[derive(Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    pub fn text(&self) -> String {
        String::from_utf8(self.0.borrow().clone()).unwrap()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
