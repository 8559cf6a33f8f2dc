//! HTML for the alarm page and the small result pages behind each action.

use std::{
    fmt::Write as _,
    path::{Path, PathBuf},
};

use crate::settings::AlarmRecord;

const STYLE: &str = r"
    body { font-family: Arial, sans-serif; max-width: 560px; margin: 2rem auto; }
    h1 { margin-bottom: .2rem }
    .card { padding: 1rem; border: 1px solid #ddd; border-radius: 12px; box-shadow: 0 2px 8px rgba(0,0,0,.06); }
    label { display:block; margin:.6rem 0 .2rem; font-weight:600 }
    select, button { padding:.4rem; font-size: 1rem; }
    .row { display:flex; gap:.5rem; align-items:center }
    .row > * { flex:1 }
    .muted { color:#666; font-size:.95rem }
    .warning { color:#b00 }
    .ok { color:#0a0 }
";

const CLOCK_SCRIPT: &str = r"
    function tick() {
      const now = new Date();
      const hh = String((now.getHours()%12)||12).padStart(2,'0');
      const mm = String(now.getMinutes()).padStart(2,'0');
      const ampm = now.getHours()>=12 ? 'PM' : 'AM';
      document.getElementById('now').textContent = hh+':'+mm+' '+ampm;
    }
    setInterval(tick, 1000); window.onload = tick;
";

const BACK: &str = "<p><a href='/'>Back</a></p>";

/// everything the home page shows
#[derive(Debug)]
pub struct HomeView<'a> {
    pub saved: Option<AlarmRecord>,
    pub catalog: &'a [PathBuf],
    pub music_dir: &'a Path,
    pub device_available: bool,
}

#[must_use]
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

fn file_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |name| name.to_string_lossy().into_owned(),
    )
}

fn options(options: &[(String, String)], selected: &str) -> String {
    let mut html = String::new();
    for (value, label) in options {
        let sel = if value == selected { " selected" } else { "" };
        let _ = writeln!(
            html,
            "<option value=\"{}\"{sel}>{}</option>",
            escape(value),
            escape(label)
        );
    }
    html
}

fn padded(range: std::ops::RangeInclusive<u8>) -> Vec<(String, String)> {
    range
        .map(|n| (format!("{n:02}"), format!("{n:02}")))
        .collect()
}

#[must_use]
pub fn home(view: &HomeView<'_>) -> String {
    let ringtones: Vec<(String, String)> = if view.catalog.is_empty() {
        vec![(String::new(), "No audio files found".to_string())]
    } else {
        view.catalog
            .iter()
            .map(|path| (path.display().to_string(), file_name(path)))
            .collect()
    };
    let ampm = vec![
        ("AM".to_string(), "AM".to_string()),
        ("PM".to_string(), "PM".to_string()),
    ];

    let saved = view.saved.clone().unwrap_or_default();
    let or = |value: &str, default: &str| {
        if value.is_empty() {
            default.to_string()
        } else {
            value.to_string()
        }
    };
    let saved_hour = or(&saved.hour, "07");
    let saved_minute = or(&saved.minute, "00");
    let saved_ampm = or(&saved.ampm, "AM");
    let saved_ringtone = or(&saved.ringtone.display().to_string(), &ringtones[0].0);

    let no_files = if view.catalog.is_empty() {
        "<p class='warning'>No audio files found. Put .mp3 or .wav files in the music folder.</p>"
    } else {
        ""
    };
    let device = if view.device_available {
        "<p class='ok'>Audio device ready.</p>"
    } else {
        "<p class='warning'>Audio device not initialized; playback will fail.</p>"
    };

    format!(
        r#"<!doctype html>
<html>
<head>
  <meta charset="utf-8" />
  <title>Alarm Clock</title>
  <style>{STYLE}</style>
  <script>{CLOCK_SCRIPT}</script>
</head>
<body>
  <h1>Alarm Clock</h1>
  <p class="muted">Current time: <strong id="now">--:-- --</strong></p>

  <div class="card">
    <form action="/save" method="get">
      <div class="row">
        <div>
          <label>Hour</label>
          <select name="hour">{hours}</select>
        </div>
        <div>
          <label>Minute</label>
          <select name="minute">{minutes}</select>
        </div>
        <div>
          <label>AM/PM</label>
          <select name="ampm">{ampm}</select>
        </div>
      </div>

      <label>Ringtone</label>
      <select name="ringtone">{ringtones}</select>

      <div style="margin-top:1rem;">
        <button type="submit">Save Alarm</button>
        <a href="/test" style="margin-left:.6rem;">Test Play</a>
      </div>

      <p class="muted" style="margin-top:.6rem;">
        Music folder used: <code>{music_dir}</code>
      </p>
      {no_files}
      {device}
    </form>
  </div>

  <div class="card" style="margin-top:1rem;">
    <form action="/stop" method="get">
      <button type="submit">Stop Alarm</button>
      <span class="muted"> (Stops looping sound)</span>
    </form>
  </div>
</body>
</html>"#,
        hours = options(&padded(1..=12), &saved_hour),
        minutes = options(&padded(0..=59), &saved_minute),
        ampm = options(&ampm, &saved_ampm),
        ringtones = options(&ringtones, &saved_ringtone),
        music_dir = escape(&view.music_dir.display().to_string()),
    )
}

fn message(body: &str) -> String {
    format!(
        "<!doctype html>\n<html>\n<head><meta charset=\"utf-8\" /><title>Alarm Clock</title></head>\n<body>{body}{BACK}</body>\n</html>"
    )
}

#[must_use]
pub fn saved(record: &AlarmRecord) -> String {
    message(&format!(
        "<h2>Saved!</h2><p>Alarm: <b>{}</b></p><p>Ringtone: <code>{}</code></p>",
        escape(&record.time12),
        escape(&file_name(&record.ringtone))
    ))
}

#[must_use]
pub fn ringtone_not_found(raw: &str, music_dir: &Path) -> String {
    let raw = if raw.is_empty() { "(empty)" } else { raw };
    message(&format!(
        "<h2>Ringtone not found</h2><p>We couldn't find: <code>{}</code></p>\
         <p>Put .mp3 or .wav files in <code>{}</code> and select again.</p>",
        escape(raw),
        escape(&music_dir.display().to_string())
    ))
}

#[must_use]
pub fn save_failed(reason: &str) -> String {
    message(&format!(
        "<h2>Couldn't save the alarm</h2><p><code>{}</code></p>",
        escape(reason)
    ))
}

#[must_use]
pub fn stopped() -> String {
    message("<h2>Stopped</h2><p>Alarm sound stopped for this minute.</p>")
}

#[must_use]
pub fn test_ok() -> String {
    message("<p>Test OK (played ~2s).</p>")
}

#[must_use]
pub fn no_ringtone() -> String {
    message("<p>No ringtone selected. Save an alarm first.</p>")
}

#[must_use]
pub fn device_unavailable() -> String {
    message("<p>Audio device not initialized. Check speakers/output.</p>")
}

#[must_use]
pub fn test_failed(reason: &str) -> String {
    message(&format!("<p>Test failed: {}</p>", escape(reason)))
}
