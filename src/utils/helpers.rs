use std::time::Duration;

/// Format a frequency value with appropriate unit suffix (Hz, kHz)
pub fn format_frequency(freq: f64) -> String {
    if freq >= 1000.0 {
        format!("{:.2} kHz", freq / 1000.0)
    } else {
        format!("{:.1} Hz", freq)
    }
}

/// Format a duration with appropriate unit suffix (ms, s)
pub fn format_time(time: Duration) -> String {
    let seconds = time.as_secs_f64();
    if seconds >= 1.0 {
        format!("{:.2} s", seconds)
    } else {
        format!("{:.1} ms", seconds * 1000.0)
    }
}

/// Level of a 16-bit sample magnitude relative to full scale
pub fn sample_to_dbfs(magnitude: i32) -> f64 {
    if magnitude <= 0 {
        -96.0 // floor for silence
    } else {
        20.0 * (magnitude as f64 / 32768.0).log10()
    }
}
