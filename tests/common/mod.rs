#![allow(dead_code)]

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use quill::error::Result;
use quill::interpreter::Interpreter;
use quill::value::Value;

/// In-memory output sink that stays readable after being boxed into an
/// interpreter.
#[derive(Clone, Default)]
pub struct SharedBuf(Rc<RefCell<Vec<u8>>>);

impl SharedBuf {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.borrow().clone()).expect("output is UTF-8")
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub fn interpreter() -> (Interpreter, SharedBuf) {
    let buf = SharedBuf::default();
    let interpreter = Interpreter::with_output(Box::new(buf.clone()));

    (interpreter, buf)
}

/// Run `source` and return the program result plus everything it printed.
pub fn run(source: &str) -> (Result<Value>, String) {
    let (mut interpreter, buf) = interpreter();
    let result = quill::run(source, &mut interpreter);

    (result, buf.contents())
}

/// Run `source`, which must succeed, and return its output.
pub fn output(source: &str) -> String {
    let (result, out) = run(source);

    if let Err(e) = result {
        panic!("program failed: {}\n--- output ---\n{}", e, out);
    }

    out
}
