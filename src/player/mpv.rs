use std::path::PathBuf;
use std::process::{Child, Command as ProcessCommand, Stdio};
use std::thread;
use std::time::Duration;

use serde_json::{Value, json};
use tracing::{debug, info, warn};

use super::{EventTracker, PlaybackElement, PlaybackSnapshot, PlayerEvent};
use crate::error::{Error, Result};

const CONNECT_ATTEMPTS: usize = 40;
const CONNECT_BACKOFF: Duration = Duration::from_millis(50);
const REPLY_TIMEOUT: Duration = Duration::from_millis(500);

/// Drives an external mpv process over its JSON IPC socket.
pub(crate) struct MpvPlayer {
    binary: String,
    socket_path: PathBuf,
    src: Option<String>,
    child: Option<Child>,
    ipc: Option<ipc::Connection>,
    tracker: EventTracker,
    last: PlaybackSnapshot,
}

impl MpvPlayer {
    pub(crate) fn new(binary: impl Into<String>) -> Self {
        let socket_path =
            std::env::temp_dir().join(format!("dubview-mpv-{}.sock", std::process::id()));
        Self {
            binary: binary.into(),
            socket_path,
            src: None,
            child: None,
            ipc: None,
            tracker: EventTracker::default(),
            last: PlaybackSnapshot {
                paused: true,
                ..PlaybackSnapshot::default()
            },
        }
    }

    fn command(&mut self, args: Value) -> Result<Value> {
        let Some(ipc) = self.ipc.as_mut() else {
            return Err(Error::PlaybackFailure("player is not running".to_string()));
        };
        ipc.request(args)
    }

    fn set_property(&mut self, name: &str, value: Value) -> Result<()> {
        self.command(json!(["set_property", name, value])).map(|_| ())
    }

    /// Unavailable properties (nothing loaded yet) read as `None`.
    fn property(&mut self, name: &str) -> Option<Value> {
        self.command(json!(["get_property", name]))
            .ok()
            .filter(|value| !value.is_null())
    }

    fn read_snapshot(&mut self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            time_pos: self.property("time-pos").and_then(|v| v.as_f64()),
            duration: self.property("duration").and_then(|v| v.as_f64()),
            paused: self
                .property("pause")
                .and_then(|v| v.as_bool())
                .unwrap_or(self.last.paused),
            eof: self
                .property("eof-reached")
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
        }
    }

    fn child_exited(&mut self) -> bool {
        match self.child.as_mut().map(Child::try_wait) {
            Some(Ok(Some(status))) => {
                info!(%status, "mpv exited");
                true
            }
            Some(Err(err)) => {
                warn!(error = %err, "failed to poll mpv process");
                true
            }
            Some(Ok(None)) => false,
            None => true,
        }
    }

    fn spawn(&mut self, url: &str) -> Result<()> {
        let _ = std::fs::remove_file(&self.socket_path);
        let child = ProcessCommand::new(&self.binary)
            .arg("--no-terminal")
            .arg("--force-window=yes")
            .arg("--keep-open=yes")
            .arg("--pause")
            .arg(format!("--input-ipc-server={}", self.socket_path.display()))
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|err| {
                Error::PlaybackFailure(format!("failed to launch {}: {err}", self.binary))
            })?;
        self.child = Some(child);

        for _ in 0..CONNECT_ATTEMPTS {
            if self.child_exited() {
                self.child = None;
                return Err(Error::PlaybackFailure(format!(
                    "{} exited before accepting commands",
                    self.binary
                )));
            }
            match ipc::Connection::open(&self.socket_path, REPLY_TIMEOUT) {
                Ok(connection) => {
                    self.ipc = Some(connection);
                    return Ok(());
                }
                Err(err) => debug!(error = %err, "mpv socket not ready yet"),
            }
            thread::sleep(CONNECT_BACKOFF);
        }

        self.stop();
        Err(Error::PlaybackFailure(
            "timed out waiting for the player to start".to_string(),
        ))
    }
}

impl PlaybackElement for MpvPlayer {
    fn set_src(&mut self, url: &str) {
        self.src = Some(url.to_string());
    }

    fn load(&mut self) -> Result<()> {
        self.stop();
        let Some(url) = self.src.clone() else {
            return Err(Error::PlaybackFailure("no source selected".to_string()));
        };
        self.tracker = EventTracker::default();
        self.last = PlaybackSnapshot {
            paused: true,
            ..PlaybackSnapshot::default()
        };
        info!(url = %url, "starting mpv");
        self.spawn(&url)
    }

    fn play(&mut self) -> Result<()> {
        self.set_property("pause", json!(false))?;
        self.last.paused = false;
        Ok(())
    }

    fn pause(&mut self) {
        match self.set_property("pause", json!(true)) {
            Ok(()) => self.last.paused = true,
            Err(err) => warn!(error = %err, "failed to pause mpv"),
        }
    }

    fn is_paused(&self) -> bool {
        self.last.paused
    }

    fn has_ended(&self) -> bool {
        self.last.eof
    }

    fn current_time(&self) -> f64 {
        self.last.time_pos.unwrap_or(0.0)
    }

    fn seek(&mut self, seconds: f64) {
        let target = seconds.max(0.0);
        match self.set_property("time-pos", json!(target)) {
            Ok(()) => self.last.time_pos = Some(target),
            Err(err) => warn!(error = %err, target, "failed to seek"),
        }
    }

    fn duration(&self) -> f64 {
        self.last.duration.unwrap_or(0.0)
    }

    fn poll_events(&mut self) -> Vec<PlayerEvent> {
        if self.child.is_none() {
            return Vec::new();
        }
        if self.child_exited() {
            // Window closed from the player side: keep the last position and
            // report it as a pause so it gets saved.
            self.child = None;
            self.ipc = None;
            self.last.paused = true;
            let last = self.last;
            return self.tracker.observe(&last);
        }

        let snapshot = self.read_snapshot();
        self.last = snapshot;
        self.tracker.observe(&snapshot)
    }

    fn stop(&mut self) {
        if self.ipc.is_some() {
            let _ = self.command(json!(["quit"]));
        }
        self.ipc = None;
        if let Some(mut child) = self.child.take() {
            if matches!(child.try_wait(), Ok(None)) {
                let _ = child.kill();
            }
            let _ = child.wait();
        }
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

impl Drop for MpvPlayer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(unix)]
mod ipc {
    use std::io::{BufRead, BufReader, Write};
    use std::os::unix::net::UnixStream;
    use std::path::Path;
    use std::time::Duration;

    use serde_json::{Value, json};

    use crate::error::{Error, Result};

    pub(super) struct Connection {
        writer: UnixStream,
        reader: BufReader<UnixStream>,
        next_id: u64,
    }

    impl Connection {
        pub(super) fn open(path: &Path, timeout: Duration) -> std::io::Result<Self> {
            let writer = UnixStream::connect(path)?;
            writer.set_read_timeout(Some(timeout))?;
            let reader = BufReader::new(writer.try_clone()?);
            Ok(Self {
                writer,
                reader,
                next_id: 1,
            })
        }

        /// Sends one command and waits for the reply carrying its request id.
        /// Asynchronous event lines in between are skipped.
        pub(super) fn request(&mut self, command: Value) -> Result<Value> {
            let request_id = self.next_id;
            self.next_id += 1;
            let mut line = json!({ "command": command, "request_id": request_id }).to_string();
            line.push('\n');
            self.writer
                .write_all(line.as_bytes())
                .map_err(|err| Error::PlaybackFailure(format!("ipc write failed: {err}")))?;

            loop {
                let mut reply = String::new();
                let read = self
                    .reader
                    .read_line(&mut reply)
                    .map_err(|err| Error::PlaybackFailure(format!("ipc read failed: {err}")))?;
                if read == 0 {
                    return Err(Error::PlaybackFailure("ipc socket closed".to_string()));
                }
                let Ok(message) = serde_json::from_str::<Value>(&reply) else {
                    continue;
                };
                if message.get("request_id").and_then(Value::as_u64) != Some(request_id) {
                    continue;
                }
                return match message.get("error").and_then(Value::as_str) {
                    Some("success") | None => {
                        Ok(message.get("data").cloned().unwrap_or(Value::Null))
                    }
                    Some(other) => Err(Error::PlaybackFailure(other.to_string())),
                };
            }
        }
    }
}

#[cfg(not(unix))]
mod ipc {
    use std::path::Path;
    use std::time::Duration;

    use serde_json::Value;

    use crate::error::{Error, Result};

    pub(super) struct Connection;

    impl Connection {
        pub(super) fn open(_path: &Path, _timeout: Duration) -> std::io::Result<Self> {
            Err(std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                "mpv IPC needs unix domain sockets",
            ))
        }

        pub(super) fn request(&mut self, _command: Value) -> Result<Value> {
            Err(Error::PlaybackFailure(
                "mpv IPC needs unix domain sockets".to_string(),
            ))
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Write};
    use std::os::unix::net::UnixListener;

    /// Minimal stand-in for mpv's IPC server: answers every request with
    /// `data` looked up by property name, after first emitting an event line.
    fn fake_mpv(path: &std::path::Path) -> thread::JoinHandle<Vec<Value>> {
        let listener = UnixListener::bind(path).expect("bind fake mpv socket");
        thread::spawn(move || {
            let (stream, _) = listener.accept().expect("accept");
            let mut writer = stream.try_clone().expect("clone");
            let reader = BufReader::new(stream);
            let mut seen = Vec::new();
            for line in reader.lines() {
                let Ok(line) = line else { break };
                let request: Value = serde_json::from_str(&line).expect("json request");
                let id = request["request_id"].clone();
                let data = match request["command"][1].as_str() {
                    Some("time-pos") => json!(42.5),
                    Some("duration") => json!(1200.0),
                    Some("pause") => json!(false),
                    Some("eof-reached") => json!(false),
                    _ => Value::Null,
                };
                seen.push(request["command"].clone());
                let _ = writeln!(writer, r#"{{"event":"property-change"}}"#);
                let _ = writeln!(
                    writer,
                    "{}",
                    json!({ "data": data, "request_id": id, "error": "success" })
                );
                if request["command"][0] == "quit" {
                    break;
                }
            }
            seen
        })
    }

    #[test]
    fn ipc_requests_skip_events_and_match_ids() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("mpv.sock");
        let server = fake_mpv(&path);

        let mut player = MpvPlayer::new("mpv");
        player.ipc = Some(ipc::Connection::open(&path, REPLY_TIMEOUT).expect("connect"));
        // Pretend a child is attached so polling goes through IPC.
        player.child = Some(
            ProcessCommand::new("sleep")
                .arg("5")
                .spawn()
                .expect("spawn placeholder child"),
        );

        let events = player.poll_events();
        assert_eq!(
            events,
            vec![
                PlayerEvent::MetadataReady(1200.0),
                PlayerEvent::Play,
                PlayerEvent::TimeAdvanced(42.5),
            ]
        );
        assert_eq!(player.current_time(), 42.5);
        assert_eq!(player.duration(), 1200.0);
        assert!(!player.is_paused());

        player.seek(-5.0);
        assert_eq!(player.current_time(), 0.0);

        player.stop();
        let seen = server.join().expect("fake mpv thread");
        assert!(seen.contains(&json!(["set_property", "time-pos", 0.0])));
        assert_eq!(seen.last(), Some(&json!(["quit"])));
    }

    #[test]
    fn commands_without_a_running_player_fail_as_playback_errors() {
        let mut player = MpvPlayer::new("mpv");
        assert!(matches!(player.play(), Err(Error::PlaybackFailure(_))));
        assert!(player.poll_events().is_empty());
    }

    #[test]
    fn load_without_source_is_rejected() {
        let mut player = MpvPlayer::new("mpv");
        assert!(matches!(player.load(), Err(Error::PlaybackFailure(_))));
    }

    #[test]
    fn missing_binary_is_a_playback_failure() {
        let mut player = MpvPlayer::new("/nonexistent/dubview-test-player");
        player.set_src("https://cdn.example.com/a_720p.mp4");
        let err = player.load().expect_err("binary does not exist");
        assert!(matches!(err, Error::PlaybackFailure(message) if message.contains("failed to launch")));
    }
}
