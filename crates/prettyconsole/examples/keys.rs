/// # keys: Exercising the Console Adapter
///
/// This example opens a console, reports its geometry and encoding, and then
/// keeps reading keys. For each key, it shows the character, key code, and
/// modifiers on the same line, overwriting the previous key. Typing `+` and
/// `-` grows and shrinks the cursor, `s` scrolls the buffer by one line, and
/// `q` exits the program. Diagnostics go to `keys.log` in the current
/// directory.
use std::fs::File;

use prettyconsole::err::report;
use prettyconsole::opt::Options;
use prettyconsole::{Color, Console};
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};

fn run() -> std::io::Result<()> {
    let options = Options::with_detailed_log();
    let mut console = Console::open_with(options)?;

    console.write_line("")?;
    console.write_line(&format!(
        "buffer {}×{}, window {}×{} at row {}, backend {:?}, encoding {}",
        console.buffer_width()?,
        console.buffer_height()?,
        console.window_width()?,
        console.window_height()?,
        console.window_top()?,
        console.backend(),
        console.output_encoding(),
    ))?;

    let foreground = console.foreground_color()?;
    console.set_foreground_color(Color::Cyan)?;
    console.write_line("press ‹+›/‹-› to resize the cursor, ‹s› to scroll, ‹q› to quit")?;
    console.set_foreground_color(foreground)?;

    console.save_cursor()?;
    loop {
        let key = console.read_key()?;

        console.restore_cursor()?;
        console.write(&format!(
            "{:?} code={:#06x} modifiers={:?}",
            key.key_char(),
            key.code(),
            key.modifiers()
        ))?;
        console.blank_rest_of_line()?;

        match key.key_char() {
            Some('q') => break,
            Some('+') => {
                let size = console.cursor_size()?;
                console.set_cursor_size(size.saturating_add(25).min(100))?;
            }
            Some('-') => {
                let size = console.cursor_size()?;
                console.set_cursor_size(size.saturating_sub(25).max(1))?;
            }
            Some('s') => console.scroll_buffer(1)?,
            _ => (),
        }
    }

    console.write_line("")?;
    console.write_line("bye bye!")?;
    Ok(())
}

fn main() {
    let config = ConfigBuilder::new().set_time_format_rfc3339().build();
    if let Ok(file) = File::create("keys.log") {
        let _ = WriteLogger::init(LevelFilter::Trace, config, file);
    }

    if let Err(error) = run() {
        log::error!("keys failed: {}", error);
        report(&error);
    }
}
