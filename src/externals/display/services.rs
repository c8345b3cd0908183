use std::io::{self, Write};

use tracing::warn;

use crate::models::humidity::Humidity;

/// Width of the rendered progress bar in characters.
const BAR_WIDTH: usize = 40;

/// This sink separates the external logic of presenting a reading from the
/// display task, which makes the task easier to unit test.
pub trait DisplaySink {
    /// Present one humidity reading: the numeric text plus the bounded
    /// 0-100 progress value.
    fn show(&mut self, reading: Humidity);
}

/// Renders readings in place on the terminal as the value text and a
/// progress bar.
pub struct TerminalDisplay;

impl DisplaySink for TerminalDisplay {
    fn show(&mut self, reading: Humidity) {
        if let Err(e) = render(reading) {
            warn!("Failed to render reading. Error: {}", e);
        }
    }
}

fn render(reading: Humidity) -> io::Result<()> {
    let progress = reading.progress() as usize;
    let filled = progress * BAR_WIDTH / 100;

    let mut stdout = io::stdout().lock();
    write!(
        stdout,
        "\rHumidity {:>6} [{}{}] {:>3}/100",
        reading.to_string(),
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled),
        progress
    )?;
    stdout.flush()
}
