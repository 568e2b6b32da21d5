//! In-memory stand-ins for the platform's console and echo control.
//!
//! Both fakes append to a shared [`Log`], so that tests can check the relative
//! order of echo changes, availability checks, reads, and writes.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::io::{Error, ErrorKind, Result};
use std::rc::Rc;

use crate::{Color, Echo, Encoding, KeyInfo, Platform};

/// Something that happened to a fake.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Event {
    EchoDisabled,
    EchoEnabled,
    KeyAvailable(bool),
    ReadKey(bool),
    Write(String),
}

/// The shared event log.
#[derive(Clone, Debug, Default)]
pub(crate) struct Log(Rc<RefCell<Vec<Event>>>);

impl Log {
    fn push(&self, event: Event) {
        self.0.borrow_mut().push(event);
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.borrow().clone()
    }

    pub fn writes(&self) -> Vec<String> {
        self.0
            .borrow()
            .iter()
            .filter_map(|event| match *event {
                Event::Write(ref text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }
}

/// A scripted answer to an availability check.
#[derive(Debug)]
enum Answer {
    No,
    Fail,
    Panic,
}

/// A fake console with an 80 by 25 buffer.
#[derive(Debug)]
pub(crate) struct FakePlatform {
    log: Log,
    native: Cell<bool>,
    queries: Cell<usize>,
    native_cursor_calls: Cell<usize>,
    cursor: Cell<(u16, u16)>,
    cursor_size: Cell<u8>,
    cursor_visible: Cell<bool>,
    buffer: Cell<(u16, u16)>,
    window: Cell<(u16, u16)>,
    window_top: Cell<u16>,
    colors: Cell<(Color, Color)>,
    encoding: Cell<Encoding>,
    rejects_encodings: Cell<bool>,
    answers: RefCell<VecDeque<Answer>>,
    keys: RefCell<VecDeque<KeyInfo>>,
}

impl FakePlatform {
    pub const WIDTH: u16 = 80;
    pub const HEIGHT: u16 = 25;
    /// Windows' `ERROR_INVALID_PARAMETER`.
    pub const INVALID_PARAMETER: i32 = 87;

    pub fn new(log: &Log) -> Self {
        Self {
            log: log.clone(),
            native: Cell::new(false),
            queries: Cell::new(0),
            native_cursor_calls: Cell::new(0),
            cursor: Cell::new((0, 0)),
            cursor_size: Cell::new(25),
            cursor_visible: Cell::new(true),
            buffer: Cell::new((Self::WIDTH, Self::HEIGHT)),
            window: Cell::new((Self::WIDTH, Self::HEIGHT)),
            window_top: Cell::new(0),
            colors: Cell::new((Color::Gray, Color::Black)),
            encoding: Cell::new(Encoding::UTF8),
            rejects_encodings: Cell::new(false),
            answers: RefCell::new(VecDeque::new()),
            keys: RefCell::new(VecDeque::new()),
        }
    }

    /// Make the native console API (un)available.
    pub fn set_native(&self, native: bool) {
        self.native.set(native);
    }

    /// Get the number of capability queries so far.
    pub fn capability_queries(&self) -> usize {
        self.queries.get()
    }

    /// Get the number of native cursor size accesses so far.
    pub fn native_cursor_calls(&self) -> usize {
        self.native_cursor_calls.get()
    }

    /// Fail all encoding accesses from now on.
    pub fn reject_encodings(&self) {
        self.rejects_encodings.set(true);
    }

    /// Queue a key.
    pub fn push_key(&self, key: KeyInfo) {
        self.keys.borrow_mut().push_back(key);
    }

    /// Report no key for the next `count` availability checks.
    pub fn delay_key(&self, count: usize) {
        let mut answers = self.answers.borrow_mut();
        for _ in 0..count {
            answers.push_back(Answer::No);
        }
    }

    /// Fail the next availability check after those already scripted.
    pub fn fail_key_available(&self) {
        self.answers.borrow_mut().push_back(Answer::Fail);
    }

    /// Panic in the next availability check after those already scripted.
    pub fn panic_key_available(&self) {
        self.answers.borrow_mut().push_back(Answer::Panic);
    }

    fn invalid_parameter() -> Error {
        Error::from_raw_os_error(Self::INVALID_PARAMETER)
    }

    fn check_position(&self, left: u16, top: u16) -> Result<()> {
        let (width, height) = self.buffer.get();
        if width <= left || height <= top {
            Err(Self::invalid_parameter())
        } else {
            Ok(())
        }
    }

    fn check_encoding(&self) -> Result<()> {
        if self.rejects_encodings.get() {
            Err(Self::invalid_parameter())
        } else {
            Ok(())
        }
    }
}

impl Platform for FakePlatform {
    fn is_console_api_available(&self, input: bool, output: bool) -> bool {
        assert!(!input && output, "console only queries output capability");
        self.queries.set(self.queries.get() + 1);
        self.native.get()
    }

    fn cursor_left(&self) -> Result<u16> {
        Ok(self.cursor.get().0)
    }

    fn set_cursor_left(&self, column: u16) -> Result<()> {
        let (_, top) = self.cursor.get();
        self.set_cursor_position(column, top)
    }

    fn cursor_top(&self) -> Result<u16> {
        Ok(self.cursor.get().1)
    }

    fn set_cursor_top(&self, row: u16) -> Result<()> {
        let (left, _) = self.cursor.get();
        self.set_cursor_position(left, row)
    }

    fn cursor_size(&self) -> Result<u8> {
        self.native_cursor_calls.set(self.native_cursor_calls.get() + 1);
        Ok(self.cursor_size.get())
    }

    fn set_cursor_size(&self, size: u8) -> Result<()> {
        self.native_cursor_calls.set(self.native_cursor_calls.get() + 1);
        self.cursor_size.set(size);
        Ok(())
    }

    fn cursor_visible(&self) -> Result<bool> {
        Ok(self.cursor_visible.get())
    }

    fn set_cursor_visible(&self, visible: bool) -> Result<()> {
        self.cursor_visible.set(visible);
        Ok(())
    }

    fn buffer_width(&self) -> Result<u16> {
        Ok(self.buffer.get().0)
    }

    fn set_buffer_width(&self, width: u16) -> Result<()> {
        let (_, height) = self.buffer.get();
        self.buffer.set((width, height));
        Ok(())
    }

    fn buffer_height(&self) -> Result<u16> {
        Ok(self.buffer.get().1)
    }

    fn set_buffer_height(&self, height: u16) -> Result<()> {
        let (width, _) = self.buffer.get();
        self.buffer.set((width, height));
        Ok(())
    }

    fn window_width(&self) -> Result<u16> {
        Ok(self.window.get().0)
    }

    fn set_window_width(&self, width: u16) -> Result<()> {
        let (_, height) = self.window.get();
        self.window.set((width, height));
        Ok(())
    }

    fn window_height(&self) -> Result<u16> {
        Ok(self.window.get().1)
    }

    fn set_window_height(&self, height: u16) -> Result<()> {
        let (width, _) = self.window.get();
        self.window.set((width, height));
        Ok(())
    }

    fn window_top(&self) -> Result<u16> {
        Ok(self.window_top.get())
    }

    fn set_window_top(&self, top: u16) -> Result<()> {
        self.window_top.set(top);
        Ok(())
    }

    fn background_color(&self) -> Result<Color> {
        Ok(self.colors.get().1)
    }

    fn set_background_color(&self, color: Color) -> Result<()> {
        let (foreground, _) = self.colors.get();
        self.colors.set((foreground, color));
        Ok(())
    }

    fn foreground_color(&self) -> Result<Color> {
        Ok(self.colors.get().0)
    }

    fn set_foreground_color(&self, color: Color) -> Result<()> {
        let (_, background) = self.colors.get();
        self.colors.set((color, background));
        Ok(())
    }

    fn output_encoding(&self) -> Result<Encoding> {
        self.check_encoding()?;
        Ok(self.encoding.get())
    }

    fn set_output_encoding(&self, encoding: Encoding) -> Result<()> {
        self.check_encoding()?;
        self.encoding.set(encoding);
        Ok(())
    }

    fn key_available(&self) -> Result<bool> {
        let answer = self.answers.borrow_mut().pop_front();
        let available = match answer {
            Some(Answer::No) => false,
            Some(Answer::Fail) => return Err(ErrorKind::BrokenPipe.into()),
            Some(Answer::Panic) => panic!("scripted panic while checking key availability"),
            None => !self.keys.borrow().is_empty(),
        };
        self.log.push(Event::KeyAvailable(available));
        Ok(available)
    }

    fn read_key(&self, intercept: bool) -> Result<KeyInfo> {
        self.log.push(Event::ReadKey(intercept));
        self.keys
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| ErrorKind::WouldBlock.into())
    }

    fn set_window_position(&self, _left: u16, top: u16) -> Result<()> {
        self.window_top.set(top);
        Ok(())
    }

    fn set_cursor_position(&self, left: u16, top: u16) -> Result<()> {
        self.check_position(left, top)?;
        self.cursor.set((left, top));
        Ok(())
    }

    fn write(&self, text: &str) -> Result<()> {
        self.log.push(Event::Write(text.to_string()));
        Ok(())
    }

    fn write_line(&self, text: &str) -> Result<()> {
        self.log.push(Event::Write(format!("{}\n", text)));
        Ok(())
    }
}

/// A fake echo control.
#[derive(Debug)]
pub(crate) struct FakeEcho {
    log: Log,
    enabled: bool,
}

impl FakeEcho {
    pub fn new(log: &Log) -> Self {
        Self {
            log: log.clone(),
            enabled: true,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Echo for FakeEcho {
    fn disable(&mut self) -> Result<()> {
        self.enabled = false;
        self.log.push(Event::EchoDisabled);
        Ok(())
    }

    fn enable(&mut self) -> Result<()> {
        self.enabled = true;
        self.log.push(Event::EchoEnabled);
        Ok(())
    }
}
