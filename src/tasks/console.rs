// PulseWatch - Console Task
//
// Line-oriented operator loop. On the device stdin is the UART console; on
// the host it is the terminal. EOF or `quit` requests shutdown of every task.

use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::console::Console;

pub fn console_task<R: BufRead, W: Write>(
    console: &Console,
    input: R,
    mut out: W,
    shutdown: &AtomicBool,
) -> io::Result<()> {
    writeln!(out, "\nSmartwatch CLI Ready")?;
    write!(out, "Type 'help' for command list\n> ")?;
    out.flush()?;

    for line in input.lines() {
        let line = line?;
        if let Some(response) = console.handle_line(&line) {
            writeln!(out, "{}", response.text)?;
            if response.quit {
                break;
            }
        }
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        write!(out, "> ")?;
        out.flush()?;
    }

    shutdown.store(true, Ordering::SeqCst);
    Ok(())
}
