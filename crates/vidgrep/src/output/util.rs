use std::time::Duration;

pub(crate) fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn split_clock(duration: Duration) -> (u64, u64, u64, u64) {
    let millis = duration_millis(duration);
    let seconds = millis / 1000;
    (seconds / 3600, (seconds / 60) % 60, seconds % 60, millis % 1000)
}

/// `HH-MM-SS-mmm`, safe for file names.
pub(crate) fn format_file_stamp(duration: Duration) -> String {
    let (hours, minutes, seconds, millis) = split_clock(duration);
    format!("{hours:02}-{minutes:02}-{seconds:02}-{millis:03}")
}

/// `H:MM:SS.mmm` for console output.
pub(crate) fn format_clock(duration: Duration) -> String {
    let (hours, minutes, seconds, millis) = split_clock(duration);
    format!("{hours}:{minutes:02}:{seconds:02}.{millis:03}")
}
